use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use golem_dispatch::config::DispatchConfig;
use golem_dispatch::messaging::{InMemoryMessageBus, InboundMessage, MessageBus, OutboundCommand};
use golem_dispatch::services::{
    FilesystemArtifactStorage, InMemoryConfigStore, RecordingOutputChannel, SkillServices,
    StaticBaseUrl, StaticWorkerDirectory, WorkerRef,
};
use golem_dispatch::{DispatchError, MusicGenerationSkill, ParameterMap, Result};

pub const BASE_URL: &str = "https://golem.test/";
pub const CAPABILITY: &str = "music_generation";

/// Bus whose transport is down
#[derive(Debug, Default)]
pub struct FailingBus;

#[async_trait]
impl MessageBus for FailingBus {
    async fn publish(&self, command: OutboundCommand) -> Result<()> {
        Err(DispatchError::publish(command.exchange, "connection refused"))
    }
}

/// A skill wired to in-process collaborators that tests can inspect
pub struct TestHarness {
    pub skill: MusicGenerationSkill,
    pub bus: Arc<InMemoryMessageBus>,
    pub workers: Arc<StaticWorkerDirectory>,
    pub config_store: Arc<InMemoryConfigStore>,
    pub output: Arc<RecordingOutputChannel>,
    pub storage_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self::build(config, None)
    }

    /// Harness whose skill publishes through `bus` instead of the recording bus
    pub fn with_bus(bus: Arc<dyn MessageBus>) -> Self {
        Self::build(DispatchConfig::default(), Some(bus))
    }

    fn build(config: DispatchConfig, bus_override: Option<Arc<dyn MessageBus>>) -> Self {
        let storage_dir = tempfile::tempdir().expect("temp dir");
        let bus = Arc::new(InMemoryMessageBus::new());
        let workers = Arc::new(StaticWorkerDirectory::new());
        let config_store = Arc::new(InMemoryConfigStore::new());
        let output = Arc::new(RecordingOutputChannel::new());

        let services = SkillServices {
            bus: bus_override.unwrap_or_else(|| bus.clone() as Arc<dyn MessageBus>),
            workers: workers.clone(),
            config_store: config_store.clone(),
            storage: Arc::new(FilesystemArtifactStorage::new(storage_dir.path(), "")),
            output: output.clone(),
            base_url: Arc::new(StaticBaseUrl::new(BASE_URL)),
        };

        Self {
            skill: MusicGenerationSkill::new(config, services),
            bus,
            workers,
            config_store,
            output,
            storage_dir,
        }
    }

    pub fn register_worker(&self, worker_id: &str) {
        self.workers.register(WorkerRef::new(worker_id, CAPABILITY));
    }

    /// Start a simulated worker answering every published command with `respond`
    ///
    /// Replies travel through the skill's completion listener, the same path
    /// a real bus runtime would use. Returning `None` leaves the command
    /// unanswered.
    pub fn spawn_worker<F>(&self, respond: F) -> JoinHandle<()>
    where
        F: Fn(&OutboundCommand) -> Option<InboundMessage> + Send + 'static,
    {
        let mut published = self.bus.subscribe();
        let (completions, receiver) = mpsc::channel(64);
        self.skill.spawn_completion_listener(receiver);

        tokio::spawn(async move {
            while let Some(command) = published.recv().await {
                if let Some(reply) = respond(&command) {
                    if completions.send(reply).await.is_err() {
                        break;
                    }
                }
            }
        })
    }

    /// Wait until `count` commands have been published
    pub async fn wait_for_published(&self, count: usize) {
        while self.bus.published_count() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn stored_file(&self, scope: &str, name: &str) -> Option<Vec<u8>> {
        std::fs::read(self.storage_dir.path().join(scope).join(name)).ok()
    }

    pub fn stored_file_count(&self, scope: &str) -> usize {
        std::fs::read_dir(self.storage_dir.path().join(scope))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Correlation key a published command was sent under
pub fn command_key(command: &OutboundCommand) -> String {
    command
        .correlation_key("socket_id")
        .map(|key| key.into_inner())
        .unwrap_or_default()
}

pub fn params(pairs: &[(&str, Value)]) -> ParameterMap {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}
