//! # Completion Handler
//!
//! Processes completion messages from the bus delivery path. Each message
//! either fails or succeeds the pending completion filed under its
//! correlation key:
//!
//! | Event | Action |
//! |---|---|
//! | `success == false` | joined worker errors go to the output channel, caller resolves with `RemoteFailure` |
//! | `success == true` | audio decoded and saved, audio card sent, caller resolves with the artifact |
//! | key not pending | logged and ignored |
//!
//! Nothing here returns an error to the delivery loop; a bad message never
//! stops other completions from being processed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::artifact::{public_url, ArtifactRenderer, AudioCardRenderer, DeliveredArtifact};
use super::ArtifactRegistry;
use crate::config::DispatchConfig;
use crate::constants;
use crate::correlation::{CorrelationKey, PendingCompletion};
use crate::error::{DispatchError, Result};
use crate::logging::{log_completion_operation, log_error};
use crate::messaging::{CompletionEvent, InboundMessage, MessageLayout};
use crate::services::SkillServices;

/// What happened to one inbound completion message
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// A pending completion was resolved
    Resolved { key: CorrelationKey, success: bool },
    /// Nothing was pending for the key: a duplicate or late delivery
    UnknownKey { key: CorrelationKey },
    /// The message could not be read at all
    Undeliverable { reason: String },
}

impl HandleOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CompletionHandler {
    config: Arc<DispatchConfig>,
    layout: MessageLayout,
    registry: Arc<ArtifactRegistry>,
    services: SkillServices,
    renderer: Arc<dyn ArtifactRenderer>,
}

impl CompletionHandler {
    pub fn new(
        config: Arc<DispatchConfig>,
        registry: Arc<ArtifactRegistry>,
        services: SkillServices,
    ) -> Self {
        let renderer = Arc::new(AudioCardRenderer::from_config(&config.artifact));
        Self::with_renderer(config, registry, services, renderer)
    }

    pub fn with_renderer(
        config: Arc<DispatchConfig>,
        registry: Arc<ArtifactRegistry>,
        services: SkillServices,
        renderer: Arc<dyn ArtifactRenderer>,
    ) -> Self {
        Self {
            layout: MessageLayout::from_config(&config),
            config,
            registry,
            services,
            renderer,
        }
    }

    /// Handle one raw message from the bus
    pub async fn handle(&self, message: &InboundMessage) -> HandleOutcome {
        match CompletionEvent::from_message(message, &self.layout) {
            Ok(event) => self.handle_event(event).await,
            Err(error) => {
                log_error("CompletionHandler", "handle", &error.to_string(), None);
                HandleOutcome::Undeliverable {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Handle an already decoded completion event
    pub async fn handle_event(&self, event: CompletionEvent) -> HandleOutcome {
        let key = event.correlation_key.clone();

        // The entry leaves the registry before any side effect; a concurrent
        // duplicate of this delivery finds nothing to take
        let Some(pending) = self.registry.take(key.as_str()) else {
            warn!(
                correlation_key = %key,
                success = event.success,
                "Completion for key with nothing pending - ignoring"
            );
            return HandleOutcome::UnknownKey { key };
        };

        let success = if event.success {
            self.handle_success(&key, &event, pending).await
        } else {
            self.handle_failure(&key, event.errors, pending).await
        };
        HandleOutcome::Resolved { key, success }
    }

    async fn handle_failure(
        &self,
        key: &CorrelationKey,
        errors: Vec<String>,
        pending: PendingCompletion<DeliveredArtifact>,
    ) -> bool {
        let message = if errors.is_empty() {
            constants::GENERATION_FAILED_MESSAGE.to_string()
        } else {
            errors.join(self.config.completion.error_separator.as_str())
        };
        self.report_error(key, &message).await;

        let elapsed_ms = pending.age().as_millis() as u64;
        self.finish(pending, Err(DispatchError::remote_failure(errors)));
        log_completion_operation(
            "resolve",
            key.as_str(),
            false,
            Some(elapsed_ms),
            Some(message.as_str()),
        );
        false
    }

    async fn handle_success(
        &self,
        key: &CorrelationKey,
        event: &CompletionEvent,
        pending: PendingCompletion<DeliveredArtifact>,
    ) -> bool {
        match self.deliver(key, event).await {
            Ok(artifact) => {
                let details = artifact.stored_path.clone();
                let elapsed_ms = pending.age().as_millis() as u64;
                self.finish(pending, Ok(artifact));
                log_completion_operation(
                    "resolve",
                    key.as_str(),
                    true,
                    Some(elapsed_ms),
                    Some(details.as_str()),
                );
                true
            }
            Err(error) => {
                log_error(
                    "CompletionHandler",
                    "deliver",
                    &error.to_string(),
                    Some(key.as_str()),
                );
                // Details stay in the log: storage errors carry host paths
                if !matches!(error, DispatchError::Output { .. }) {
                    self.report_error(key, constants::GENERATION_FAILED_MESSAGE)
                        .await;
                }
                self.finish(pending, Err(error));
                false
            }
        }
    }

    /// Decode, persist and present the result, returning what was delivered
    async fn deliver(&self, key: &CorrelationKey, event: &CompletionEvent) -> Result<DeliveredArtifact> {
        let artifact_config = &self.config.artifact;
        let audio = event.decode_audio(&artifact_config.content_field)?;

        let storage = &self.services.storage;
        let file_name = storage
            .next_file_name(
                key.as_str(),
                &artifact_config.file_prefix,
                &artifact_config.file_extension,
            )
            .await?;
        let stored_path = storage.save(key.as_str(), &file_name, &audio).await?;
        info!(
            correlation_key = %key,
            path = %stored_path,
            bytes = audio.len(),
            "💾 Saved generated music"
        );

        let base_url = self.services.base_url.base_url();
        let artifact = DeliveredArtifact {
            correlation_key: key.clone(),
            file_name,
            public_url: public_url(&base_url, &stored_path),
            stored_path,
            byte_len: audio.len(),
        };

        let card = self.renderer.render(&artifact, &base_url);
        self.services
            .output
            .send_response(&card, &[], key.as_str())
            .await
            .map_err(|e| match e {
                DispatchError::Output { .. } => e,
                other => DispatchError::output(other.to_string()),
            })?;

        Ok(artifact)
    }

    async fn report_error(&self, key: &CorrelationKey, message: &str) {
        if let Err(error) = self.services.output.send_error(message, key.as_str()).await {
            log_error(
                "CompletionHandler",
                "send_error",
                &error.to_string(),
                Some(key.as_str()),
            );
        }
    }

    fn finish(
        &self,
        pending: PendingCompletion<DeliveredArtifact>,
        outcome: Result<DeliveredArtifact>,
    ) {
        let key = pending.key().clone();
        if !pending.complete(outcome) {
            debug!(correlation_key = %key, "Completion resolved but caller is no longer waiting");
        }
    }
}
