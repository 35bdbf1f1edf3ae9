//! # Music Generation Skill
//!
//! Entry point tying dispatch and completion handling to one shared
//! correlation registry. Callers use [`MusicGenerationSkill::submit`]; the
//! bus runtime feeds completion messages into
//! [`MusicGenerationSkill::spawn_completion_listener`] or calls
//! [`MusicGenerationSkill::handle_completion`] directly.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{ConfigManager, DispatchConfig};
use crate::correlation::{CorrelationKey, RegistryMetrics};
use crate::dispatch::{
    ArtifactRegistry, CommandDispatcher, CompletionHandler, DeliveredArtifact, HandleOutcome,
    ParameterMap,
};
use crate::error::Result;
use crate::messaging::InboundMessage;
use crate::services::SkillServices;

#[derive(Debug, Clone)]
pub struct MusicGenerationSkill {
    config: Arc<DispatchConfig>,
    registry: Arc<ArtifactRegistry>,
    dispatcher: CommandDispatcher,
    handler: CompletionHandler,
}

impl MusicGenerationSkill {
    pub fn new(config: DispatchConfig, services: SkillServices) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ArtifactRegistry::new());
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&config), Arc::clone(&registry), services.clone());
        let handler = CompletionHandler::new(Arc::clone(&config), Arc::clone(&registry), services);

        info!(
            exchange = %config.protocol.exchange,
            command = %config.protocol.command_name,
            capability = %config.protocol.capability,
            "🎵 Music generation skill ready"
        );

        Self {
            config,
            registry,
            dispatcher,
            handler,
        }
    }

    pub fn from_manager(manager: &ConfigManager, services: SkillServices) -> Self {
        Self::new(manager.config().clone(), services)
    }

    /// Generate music for `key` with the configured capability
    pub async fn submit(&self, key: CorrelationKey, parameters: ParameterMap) -> Result<DeliveredArtifact> {
        self.dispatcher
            .submit(&self.config.protocol.capability, key, parameters)
            .await
    }

    /// Generate music using workers registered under `capability`
    pub async fn submit_to(
        &self,
        capability: &str,
        key: CorrelationKey,
        parameters: ParameterMap,
    ) -> Result<DeliveredArtifact> {
        self.dispatcher.submit(capability, key, parameters).await
    }

    pub async fn handle_completion(&self, message: &InboundMessage) -> HandleOutcome {
        self.handler.handle(message).await
    }

    /// Process completion messages until the sender side closes
    ///
    /// Each message is handled on its own task, so a slow artifact save does
    /// not hold up other completions.
    pub fn spawn_completion_listener(
        &self,
        mut receiver: mpsc::Receiver<InboundMessage>,
    ) -> JoinHandle<()> {
        let handler = self.handler.clone();
        tokio::spawn(async move {
            info!("👂 Completion listener started");
            while let Some(message) = receiver.recv().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let outcome = handler.handle(&message).await;
                    debug!(?outcome, "Completion message processed");
                });
            }
            info!("Completion listener stopped: delivery channel closed");
        })
    }

    /// Resolve entries older than the configured completion timeout as timed out
    pub fn expire_stale(&self) -> Vec<CorrelationKey> {
        match self.config.completion.timeout() {
            Some(limit) => self.registry.expire_older_than(limit),
            None => Vec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn pending_count(&self) -> usize {
        self.registry.size()
    }

    pub fn metrics(&self) -> RegistryMetrics {
        self.registry.metrics()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }
}
