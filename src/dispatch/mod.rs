//! # Dispatch
//!
//! The command/completion protocol built on the correlation registry:
//! payload merging, command dispatch, completion handling and artifact
//! presentation.

pub mod artifact;
pub mod completion_handler;
pub mod dispatcher;
pub mod payload;

pub use artifact::{public_url, ArtifactRenderer, AudioCardRenderer, DeliveredArtifact};
pub use completion_handler::{CompletionHandler, HandleOutcome};
pub use dispatcher::{CommandDispatcher, PendingGuard};
pub use payload::{build_payload, CommandPayload, ParameterMap};

/// Registry of commands awaiting their delivered music
pub type ArtifactRegistry = crate::correlation::CorrelationRegistry<DeliveredArtifact>;
