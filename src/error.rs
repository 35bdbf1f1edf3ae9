//! # Dispatch Error Types
//!
//! Structured error handling for the command/completion protocol using
//! thiserror instead of `Box<dyn Error>` patterns.

use thiserror::Error;

use crate::config::ConfigurationError;

/// Errors raised while dispatching a command or resolving its completion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("No workers are online for capability: {capability}")]
    NoWorkerAvailable { capability: String },

    #[error("Worker reported failure: {}", errors.join("; "))]
    RemoteFailure { errors: Vec<String> },

    #[error("Failed to decode completion payload: {message}")]
    Decode { message: String },

    #[error("No pending completion registered for key: {key}")]
    UnknownKey { key: String },

    #[error("A completion is already pending for key: {key}")]
    DuplicateKey { key: String },

    #[error("Failed to publish command to {exchange}: {message}")]
    Publish { exchange: String, message: String },

    #[error("No completion for {key} within {timeout_ms}ms")]
    Timeout { key: String, timeout_ms: u64 },

    #[error("Completion for {key} was dropped before it resolved")]
    Abandoned { key: String },

    #[error("Artifact storage error: {message}")]
    Storage { message: String },

    #[error("Output channel error: {message}")]
    Output { message: String },

    #[error("Invalid parameter {field}: {message}")]
    InvalidParameter { field: String, message: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl DispatchError {
    /// Create a no-worker-available error
    pub fn no_worker_available(capability: impl Into<String>) -> Self {
        Self::NoWorkerAvailable {
            capability: capability.into(),
        }
    }

    /// Create a remote failure error carrying the worker's error strings
    pub fn remote_failure(errors: Vec<String>) -> Self {
        Self::RemoteFailure { errors }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an unknown key error
    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Create a publish error
    pub fn publish(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            exchange: exchange.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(key: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            key: key.into(),
            timeout_ms,
        }
    }

    /// Create an abandoned completion error
    pub fn abandoned(key: impl Into<String>) -> Self {
        Self::Abandoned { key: key.into() }
    }

    /// Create an artifact storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an output channel error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the worker's reply was unusable, either reported as failed or undecodable
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteFailure { .. } | Self::Decode { .. })
    }

    /// Error strings reported by the worker, if this is a remote failure
    pub fn remote_errors(&self) -> Option<&[String]> {
        match self {
            Self::RemoteFailure { errors } => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
