//! # External Collaborators
//!
//! Interfaces to the services the dispatch core calls through to: worker
//! discovery, stored configuration, artifact persistence and the caller's
//! output channel, each with an in-process implementation.

pub mod artifact_storage;
pub mod config_store;
pub mod output;
pub mod worker_selection_service;

use std::sync::Arc;

use crate::messaging::MessageBus;

pub use artifact_storage::{ArtifactStorage, FilesystemArtifactStorage};
pub use config_store::{ConfigStore, InMemoryConfigStore};
pub use output::{
    BaseUrlProvider, OutputChannel, OutputRecord, RecordingOutputChannel, StaticBaseUrl,
};
pub use worker_selection_service::{select_worker, StaticWorkerDirectory, WorkerDirectory, WorkerRef};

/// Every collaborator a skill needs, shared between dispatch and completion
#[derive(Debug, Clone)]
pub struct SkillServices {
    pub bus: Arc<dyn MessageBus>,
    pub workers: Arc<dyn WorkerDirectory>,
    pub config_store: Arc<dyn ConfigStore>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub output: Arc<dyn OutputChannel>,
    pub base_url: Arc<dyn BaseUrlProvider>,
}
