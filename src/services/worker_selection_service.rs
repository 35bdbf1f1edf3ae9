use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DispatchError, Result};

/// Reference to a remote worker able to perform a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub worker_id: String,
    pub capability: String,
    pub metadata: Option<serde_json::Value>,
}

impl WorkerRef {
    pub fn new(worker_id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            capability: capability.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Capability registry listing workers that are currently online
#[async_trait]
pub trait WorkerDirectory: Send + Sync + std::fmt::Debug {
    async fn list_online(&self, capability: &str) -> Result<Vec<WorkerRef>>;
}

/// Pick the worker a command goes to: the first one online
pub async fn select_worker(directory: &dyn WorkerDirectory, capability: &str) -> Result<WorkerRef> {
    let workers = directory.list_online(capability).await?;

    match workers.into_iter().next() {
        Some(selected) => {
            info!(
                worker_id = %selected.worker_id,
                capability = %capability,
                "Selected worker"
            );
            Ok(selected)
        }
        None => {
            debug!(capability = %capability, "No online workers for capability");
            Err(DispatchError::no_worker_available(capability))
        }
    }
}

/// In-process worker directory, populated by registration calls
#[derive(Debug, Default)]
pub struct StaticWorkerDirectory {
    workers: RwLock<HashMap<String, Vec<WorkerRef>>>,
}

impl StaticWorkerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under its capability; re-registering replaces it in place
    pub fn register(&self, worker: WorkerRef) {
        let mut workers = self.workers.write();
        let online = workers.entry(worker.capability.clone()).or_default();
        match online.iter_mut().find(|w| w.worker_id == worker.worker_id) {
            Some(existing) => *existing = worker,
            None => online.push(worker),
        }
    }

    /// Take a worker offline. Returns `false` if it was not registered.
    pub fn unregister(&self, capability: &str, worker_id: &str) -> bool {
        let mut workers = self.workers.write();
        let Some(online) = workers.get_mut(capability) else {
            return false;
        };
        let before = online.len();
        online.retain(|w| w.worker_id != worker_id);
        before != online.len()
    }
}

#[async_trait]
impl WorkerDirectory for StaticWorkerDirectory {
    async fn list_online(&self, capability: &str) -> Result<Vec<WorkerRef>> {
        Ok(self
            .workers
            .read()
            .get(capability)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_first_online_worker() {
        let directory = StaticWorkerDirectory::new();
        directory.register(WorkerRef::new("golem-a", "music_generation"));
        directory.register(WorkerRef::new("golem-b", "music_generation"));
        directory.register(WorkerRef::new("golem-c", "image_generation"));

        let selected = select_worker(&directory, "music_generation").await.unwrap();
        assert_eq!(selected.worker_id, "golem-a");
    }

    #[tokio::test]
    async fn test_no_worker_available() {
        let directory = StaticWorkerDirectory::new();
        directory.register(WorkerRef::new("golem-a", "music_generation"));
        assert!(directory.unregister("music_generation", "golem-a"));
        assert!(!directory.unregister("music_generation", "golem-a"));

        let result = select_worker(&directory, "music_generation").await;
        assert_eq!(
            result.unwrap_err(),
            DispatchError::no_worker_available("music_generation")
        );
    }

    #[tokio::test]
    async fn test_reregistration_replaces_in_place() {
        let directory = StaticWorkerDirectory::new();
        directory.register(WorkerRef::new("golem-a", "music_generation"));
        directory.register(
            WorkerRef::new("golem-a", "music_generation")
                .with_metadata(serde_json::json!({"gpu": "a100"})),
        );

        let online = directory.list_online("music_generation").await.unwrap();
        assert_eq!(online.len(), 1);
        assert!(online[0].metadata.is_some());
    }
}
