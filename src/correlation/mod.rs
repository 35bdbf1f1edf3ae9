//! # Correlation
//!
//! Pairs a dispatched command with the completion event that eventually
//! answers it. The [`CorrelationRegistry`] is the only state shared between
//! the dispatching caller and the bus delivery path.
//!
//! ```text
//! dispatch ──register(key)──→ CorrelationRegistry ←──resolve(key)── completion handler
//!    │                                │
//!    └── awaits CompletionHandle ←────┘ (one-shot, consumed on first resolve)
//! ```

pub mod key;
pub mod pending;
pub mod registry;

pub use key::CorrelationKey;
pub use pending::{completion_channel, CompletionHandle, CompletionSink, PendingCompletion};
pub use registry::{CorrelationRegistry, RegistryMetrics};
