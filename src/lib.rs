#![allow(clippy::doc_markdown)] // Allow technical terms like base64, WAV in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Golem Dispatch
//!
//! Command/completion protocol for the music generation skill: commands are
//! published to remote golem workers over a message bus and each one is
//! answered later by exactly one asynchronous completion message.
//!
//! ## Architecture
//!
//! The [`correlation::CorrelationRegistry`] is the only state shared between
//! the caller waiting on a command and the bus delivery path that receives
//! completions. A pending completion is registered under its correlation key
//! before the command is published and removed before it is resolved, so a
//! completion is delivered to its caller at most once.
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (files and environment)
//! - [`correlation`] - Correlation keys, one-shot completions and the registry
//! - [`dispatch`] - Payload merging, command dispatch, completion handling
//! - [`messaging`] - Outbound commands, inbound completion messages, bus trait
//! - [`services`] - Worker directory, config store, storage and output collaborators
//! - [`skill`] - The [`MusicGenerationSkill`] entry point
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use golem_dispatch::config::DispatchConfig;
//! use golem_dispatch::messaging::InMemoryMessageBus;
//! use golem_dispatch::services::{
//!     FilesystemArtifactStorage, InMemoryConfigStore, RecordingOutputChannel, SkillServices,
//!     StaticBaseUrl, StaticWorkerDirectory,
//! };
//! use golem_dispatch::{CorrelationKey, MusicGenerationSkill};
//!
//! # async fn example() -> golem_dispatch::Result<()> {
//! let services = SkillServices {
//!     bus: Arc::new(InMemoryMessageBus::new()),
//!     workers: Arc::new(StaticWorkerDirectory::new()),
//!     config_store: Arc::new(InMemoryConfigStore::new()),
//!     storage: Arc::new(FilesystemArtifactStorage::new("/srv/golem/workspace", "workspace")),
//!     output: Arc::new(RecordingOutputChannel::new()),
//!     base_url: Arc::new(StaticBaseUrl::new("https://golem.example.com/")),
//! };
//! let skill = MusicGenerationSkill::new(DispatchConfig::default(), services);
//!
//! let mut parameters = serde_json::Map::new();
//! parameters.insert("prompt".into(), "calm piano".into());
//! let artifact = skill.submit(CorrelationKey::generate(), parameters).await?;
//! println!("saved to {}", artifact.public_url);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod services;
pub mod skill;

pub use config::{ConfigManager, ConfigurationError, DispatchConfig};
pub use correlation::{CorrelationKey, CorrelationRegistry, RegistryMetrics};
pub use dispatch::{
    build_payload, ArtifactRegistry, CommandDispatcher, CommandPayload, CompletionHandler, DeliveredArtifact,
    HandleOutcome, ParameterMap,
};
pub use error::{DispatchError, Result};
pub use messaging::{CompletionEvent, InboundMessage, MessageBus, OutboundCommand};
pub use services::SkillServices;
pub use skill::MusicGenerationSkill;
