//! # Command Dispatcher
//!
//! Turns a caller's request into a published worker command and a future
//! that resolves when the matching completion arrives.
//!
//! ## Ordering
//!
//! The pending completion is registered before the command is published, so a
//! worker that answers immediately always finds its entry. A failed publish
//! evicts the entry again before the error is returned.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::artifact::DeliveredArtifact;
use super::payload::{CommandPayload, ParameterMap};
use crate::config::DispatchConfig;
use crate::constants;
use super::ArtifactRegistry;
use crate::correlation::{CompletionHandle, CorrelationKey};
use crate::error::{DispatchError, Result};
use crate::logging::{log_dispatch_operation, log_error};
use crate::messaging::OutboundCommand;
use crate::services::{select_worker, SkillServices, WorkerRef};

/// Publishes commands and waits for their completions
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    config: Arc<DispatchConfig>,
    registry: Arc<ArtifactRegistry>,
    services: SkillServices,
}

impl CommandDispatcher {
    pub fn new(
        config: Arc<DispatchConfig>,
        registry: Arc<ArtifactRegistry>,
        services: SkillServices,
    ) -> Self {
        Self {
            config,
            registry,
            services,
        }
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// First online worker for `capability`
    pub async fn select_worker(&self, capability: &str) -> Result<WorkerRef> {
        select_worker(self.services.workers.as_ref(), capability).await
    }

    /// Merge built-in defaults, the stored config group and caller overrides
    pub async fn build_payload(&self, overrides: &ParameterMap) -> Result<CommandPayload> {
        let payload_config = &self.config.payload;
        let stored = self
            .services
            .config_store
            .get_group(&payload_config.config_group)
            .await?;

        if stored.is_none() {
            debug!(group = %payload_config.config_group, "No stored configuration group, using defaults");
        }

        payload_config.build(stored.as_ref(), overrides)
    }

    /// Register `key`, publish the command to `worker` and return the handle to await
    ///
    /// Fails with `DuplicateKey` if `key` is already pending; nothing is
    /// published in that case. A publish failure, or dropping this future
    /// before the publish finishes, evicts the registration.
    pub async fn dispatch(
        &self,
        worker: WorkerRef,
        key: CorrelationKey,
        payload: CommandPayload,
    ) -> Result<CompletionHandle<DeliveredArtifact>> {
        let (handle, mut guard) = self.dispatch_guarded(worker, key, payload).await?;
        guard.disarm();
        Ok(handle)
    }

    #[instrument(skip(self, payload), fields(correlation_key = %key, worker_id = %worker.worker_id))]
    async fn dispatch_guarded(
        &self,
        worker: WorkerRef,
        key: CorrelationKey,
        payload: CommandPayload,
    ) -> Result<(CompletionHandle<DeliveredArtifact>, PendingGuard)> {
        let protocol = &self.config.protocol;
        let handle = self.registry.register_pending(key.clone())?;
        // Armed across the publish await
        let mut guard = PendingGuard::new(Arc::clone(&self.registry), key.clone());

        let worker_id = worker.worker_id.clone();
        let command = OutboundCommand::new(&protocol.exchange, worker, &protocol.command_name, payload)
            .with_header(&protocol.correlation_header, Value::String(key.as_str().to_string()));
        let command_id = command.command_id;

        if let Err(error) = self.services.bus.publish(command).await {
            guard.disarm();
            self.registry.evict(key.as_str());
            log_error(
                "CommandDispatcher",
                "dispatch",
                &error.to_string(),
                Some(key.as_str()),
            );
            return Err(match error {
                DispatchError::Publish { .. } => error,
                other => DispatchError::publish(&protocol.exchange, other.to_string()),
            });
        }

        log_dispatch_operation(
            "publish",
            key.as_str(),
            Some(worker_id.as_str()),
            "published",
            Some(format!("command_id={command_id}").as_str()),
        );
        Ok((handle, guard))
    }

    /// Run one complete command: select a worker, build the payload, dispatch
    /// and wait for the completion
    ///
    /// With no worker online the user is told so on the output channel and
    /// `NoWorkerAvailable` is returned without registering anything. If the
    /// returned future is dropped while publishing or waiting, the
    /// registration is evicted.
    pub async fn submit(
        &self,
        capability: &str,
        key: CorrelationKey,
        parameters: ParameterMap,
    ) -> Result<DeliveredArtifact> {
        let started = Instant::now();

        let worker = match self.select_worker(capability).await {
            Ok(worker) => worker,
            Err(error @ DispatchError::NoWorkerAvailable { .. }) => {
                warn!(correlation_key = %key, capability = %capability, "🚫 No worker available");
                if let Err(output_error) = self
                    .services
                    .output
                    .send_error(constants::NO_MUSIC_GENERATORS_MESSAGE, key.as_str())
                    .await
                {
                    log_error(
                        "CommandDispatcher",
                        "submit",
                        &output_error.to_string(),
                        Some(key.as_str()),
                    );
                }
                return Err(error);
            }
            Err(error) => return Err(error),
        };

        let payload = self.build_payload(&parameters).await?;
        let (handle, mut guard) = self.dispatch_guarded(worker, key.clone(), payload).await?;

        let outcome = match self.config.completion.timeout() {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.registry.evict(key.as_str());
                    warn!(
                        correlation_key = %key,
                        timeout_ms = limit.as_millis() as u64,
                        "⏰ Completion did not arrive in time"
                    );
                    Err(DispatchError::timeout(key.as_str(), limit.as_millis() as u64))
                }
            },
            None => handle.await,
        };
        guard.disarm();

        info!(
            correlation_key = %key,
            success = outcome.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Submit finished"
        );
        outcome
    }
}

/// Evicts a registration when the waiting caller goes away before it resolves
#[derive(Debug)]
pub struct PendingGuard {
    registry: Arc<ArtifactRegistry>,
    key: CorrelationKey,
    armed: bool,
}

impl PendingGuard {
    pub fn new(registry: Arc<ArtifactRegistry>, key: CorrelationKey) -> Self {
        Self {
            registry,
            key,
            armed: true,
        }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed && self.registry.evict(self.key.as_str()) {
            debug!(correlation_key = %self.key, "Caller abandoned pending completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryMessageBus;
    use crate::services::{
        FilesystemArtifactStorage, InMemoryConfigStore, RecordingOutputChannel, StaticBaseUrl,
        StaticWorkerDirectory,
    };
    use crate::messaging::MessageBus;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Bus whose publish never finishes
    #[derive(Debug, Default)]
    struct StalledBus {
        entered: Notify,
    }

    #[async_trait]
    impl MessageBus for StalledBus {
        async fn publish(&self, _command: OutboundCommand) -> Result<()> {
            self.entered.notify_one();
            std::future::pending().await
        }
    }

    struct Fixture {
        dispatcher: CommandDispatcher,
        bus: Arc<InMemoryMessageBus>,
        workers: Arc<StaticWorkerDirectory>,
        config_store: Arc<InMemoryConfigStore>,
        output: Arc<RecordingOutputChannel>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        fixture_with_bus(None)
    }

    fn fixture_with_bus(bus_override: Option<Arc<dyn MessageBus>>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(InMemoryMessageBus::new());
        let workers = Arc::new(StaticWorkerDirectory::new());
        let config_store = Arc::new(InMemoryConfigStore::new());
        let output = Arc::new(RecordingOutputChannel::new());
        let services = SkillServices {
            bus: bus_override.unwrap_or_else(|| bus.clone() as Arc<dyn MessageBus>),
            workers: workers.clone(),
            config_store: config_store.clone(),
            storage: Arc::new(FilesystemArtifactStorage::new(dir.path(), "")),
            output: output.clone(),
            base_url: Arc::new(StaticBaseUrl::new("https://golem.local/")),
        };
        let dispatcher = CommandDispatcher::new(
            Arc::new(DispatchConfig::default()),
            Arc::new(ArtifactRegistry::new()),
            services,
        );
        Fixture {
            dispatcher,
            bus,
            workers,
            config_store,
            output,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_build_payload_uses_stored_group() {
        let fx = fixture();
        let mut stored = ParameterMap::new();
        stored.insert("guidance_scale".into(), json!(4));
        stored.insert("length_in_seconds".into(), json!(20));
        fx.config_store.set_group("chat_ability/music_generation", stored);

        let mut overrides = ParameterMap::new();
        overrides.insert("prompt".into(), json!("lofi beats"));
        overrides.insert("length_in_seconds".into(), json!(12));

        let payload = fx.dispatcher.build_payload(&overrides).await.unwrap();
        assert_eq!(payload.get("guidance_scale"), Some(&json!(4)));
        assert_eq!(payload.get("seconds"), Some(&json!(12)));
        assert_eq!(payload.get("prompt"), Some(&json!("lofi beats")));
        assert!(!payload.contains_key("length_in_seconds"));
    }

    #[tokio::test]
    async fn test_dispatch_registers_before_publish_and_sets_header() {
        let fx = fixture();
        let mut published = fx.bus.subscribe();
        let worker = WorkerRef::new("golem-a", "music_generation");

        let _handle = fx
            .dispatcher
            .dispatch(worker, CorrelationKey::from("socket-1"), CommandPayload::default())
            .await
            .unwrap();

        assert!(fx.dispatcher.registry().contains("socket-1"));
        let command = published.recv().await.unwrap();
        assert_eq!(command.exchange, "golem_skill");
        assert_eq!(command.command_name, "generate_music_wav");
        assert_eq!(command.target.worker_id, "golem-a");
        assert_eq!(command.headers.get("socket_id"), Some(&json!("socket-1")));
    }

    #[tokio::test]
    async fn test_duplicate_dispatch_is_rejected_without_publishing() {
        let fx = fixture();
        let worker = WorkerRef::new("golem-a", "music_generation");

        let _first = fx
            .dispatcher
            .dispatch(worker.clone(), CorrelationKey::from("socket-1"), CommandPayload::default())
            .await
            .unwrap();
        let second = fx
            .dispatcher
            .dispatch(worker, CorrelationKey::from("socket-1"), CommandPayload::default())
            .await;

        assert!(matches!(second, Err(DispatchError::DuplicateKey { .. })));
        assert_eq!(fx.bus.published_count(), 1);
        assert_eq!(fx.dispatcher.registry().size(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_workers_reports_to_user() {
        let fx = fixture();

        let result = fx
            .dispatcher
            .submit("music_generation", CorrelationKey::from("socket-1"), ParameterMap::new())
            .await;

        assert_eq!(
            result.unwrap_err(),
            DispatchError::no_worker_available("music_generation")
        );
        assert_eq!(
            fx.output.errors_for("socket-1"),
            vec!["No music generators are currently running.".to_string()]
        );
        assert!(fx.dispatcher.registry().is_empty());
        assert_eq!(fx.bus.published_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_submit_evicts_registration() {
        let fx = fixture();
        fx.workers
            .register(WorkerRef::new("golem-a", "music_generation"));

        let dispatcher = fx.dispatcher.clone();
        let task = tokio::spawn(async move {
            dispatcher
                .submit("music_generation", CorrelationKey::from("socket-1"), ParameterMap::new())
                .await
        });

        // Wait until the command is out, then cancel the caller
        while fx.bus.published_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(fx.dispatcher.registry().contains("socket-1"));
        task.abort();
        let _ = task.await;

        assert!(!fx.dispatcher.registry().contains("socket-1"));
    }

    #[tokio::test]
    async fn test_submit_dropped_during_publish_evicts_registration() {
        let bus = Arc::new(StalledBus::default());
        let fx = fixture_with_bus(Some(bus.clone()));
        fx.workers
            .register(WorkerRef::new("golem-a", "music_generation"));

        let dispatcher = fx.dispatcher.clone();
        let task = tokio::spawn(async move {
            dispatcher
                .submit("music_generation", CorrelationKey::from("socket-1"), ParameterMap::new())
                .await
        });

        bus.entered.notified().await;
        assert!(fx.dispatcher.registry().contains("socket-1"));
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(fx.dispatcher.registry().is_empty());
        // The session can submit again under the same key
        assert!(fx
            .dispatcher
            .registry()
            .register_pending(CorrelationKey::from("socket-1"))
            .is_ok());
    }
}
