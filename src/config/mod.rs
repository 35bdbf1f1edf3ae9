//! # Dispatch Configuration
//!
//! Typed configuration for the music generation command protocol. Every
//! section has defaults matching the protocol constants, so an absent
//! configuration file yields a working setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use golem_dispatch::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let exchange = &manager.config().protocol.exchange;
//! let timeout = manager.config().completion.timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::constants::{self, artifact, completion, defaults, fields};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    pub protocol: ProtocolConfig,
    pub payload: PayloadConfig,
    pub completion: CompletionConfig,
    pub artifact: ArtifactConfig,
}

/// Names used on the message bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    pub exchange: String,
    pub command_name: String,
    pub capability: String,
    pub correlation_header: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            exchange: constants::SKILL_EXCHANGE.to_string(),
            command_name: constants::GENERATE_MUSIC_COMMAND.to_string(),
            capability: constants::MUSIC_GENERATION_CAPABILITY.to_string(),
            correlation_header: constants::CORRELATION_HEADER.to_string(),
        }
    }
}

/// Where payload parameters come from and how they are shaped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PayloadConfig {
    /// Config store group consulted on every dispatch
    pub config_group: String,
    /// Built-in parameter defaults, lowest precedence
    pub defaults: Map<String, Value>,
    pub policy: PayloadPolicy,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        let mut defaults_map = Map::new();
        defaults_map.insert(
            fields::LENGTH_IN_SECONDS.to_string(),
            json!(defaults::LENGTH_IN_SECONDS),
        );
        defaults_map.insert(
            fields::GUIDANCE_SCALE.to_string(),
            json!(defaults::GUIDANCE_SCALE),
        );

        Self {
            config_group: constants::MUSIC_CONFIG_GROUP.to_string(),
            defaults: defaults_map,
            policy: PayloadPolicy::default(),
        }
    }
}

/// Clamp, rename and forced-field rules applied after merging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PayloadPolicy {
    /// Caller parameters that may override stored values; empty accepts every field
    pub override_fields: Vec<String>,
    pub clamps: Vec<FieldClamp>,
    pub renames: Vec<FieldRename>,
    /// Fields set unconditionally on the outbound payload
    pub forced: Map<String, Value>,
}

impl Default for PayloadPolicy {
    fn default() -> Self {
        let mut forced = Map::new();
        forced.insert(fields::PROGRESS.to_string(), Value::Bool(true));

        Self {
            override_fields: vec![
                fields::PROMPT.to_string(),
                fields::LENGTH_IN_SECONDS.to_string(),
                fields::GUIDANCE_SCALE.to_string(),
            ],
            clamps: vec![
                FieldClamp::new(fields::LENGTH_IN_SECONDS, defaults::MAX_LENGTH_IN_SECONDS),
                FieldClamp::new(fields::GUIDANCE_SCALE, defaults::MAX_GUIDANCE_SCALE),
            ],
            renames: vec![FieldRename::new(fields::LENGTH_IN_SECONDS, fields::SECONDS)],
            forced,
        }
    }
}

/// Upper bound for a numeric payload field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldClamp {
    pub field: String,
    pub max: f64,
}

impl FieldClamp {
    pub fn new(field: impl Into<String>, max: f64) -> Self {
        Self {
            field: field.into(),
            max,
        }
    }
}

/// Internal field name mapped onto the worker protocol's name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRename {
    pub from: String,
    pub to: String,
}

impl FieldRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Completion waiting and error reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Seconds to wait for a completion; `None` or `0` waits indefinitely
    ///
    /// `0` is the spelling available to files and `GOLEM_DISPATCH__COMPLETION__TIMEOUT_SECONDS`.
    pub timeout_seconds: Option<u64>,
    pub error_separator: String,
    pub success_header: String,
    pub errors_header: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: Some(defaults::COMPLETION_TIMEOUT_SECONDS),
            error_separator: completion::ERROR_SEPARATOR.to_string(),
            success_header: completion::SUCCESS_HEADER.to_string(),
            errors_header: completion::ERRORS_HEADER.to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }
}

/// Artifact naming and presentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtifactConfig {
    pub file_prefix: String,
    pub file_extension: String,
    pub mime_type: String,
    pub background_asset: String,
    /// Completion content field holding the base64 result
    pub content_field: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            file_prefix: artifact::FILE_PREFIX.to_string(),
            file_extension: artifact::FILE_EXTENSION.to_string(),
            mime_type: artifact::MIME_TYPE.to_string(),
            background_asset: artifact::BACKGROUND_ASSET.to_string(),
            content_field: completion::CONTENT_FIELD.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Validate the configuration, rejecting values that would break dispatch
    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("protocol.exchange", &self.protocol.exchange),
            ("protocol.command_name", &self.protocol.command_name),
            ("protocol.capability", &self.protocol.capability),
            ("protocol.correlation_header", &self.protocol.correlation_header),
            ("artifact.file_extension", &self.artifact.file_extension),
            ("artifact.content_field", &self.artifact.content_field),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "dispatch configuration",
                ));
            }
        }

        for clamp in &self.payload.policy.clamps {
            if !clamp.max.is_finite() || clamp.max <= 0.0 {
                return Err(ConfigurationError::invalid_value(
                    format!("payload.policy.clamps.{}", clamp.field),
                    clamp.max.to_string(),
                    "ceiling must be a positive finite number",
                ));
            }
        }

        for rename in &self.payload.policy.renames {
            if rename.from == rename.to {
                return Err(ConfigurationError::invalid_value(
                    "payload.policy.renames",
                    rename.from.clone(),
                    "rename source and target must differ",
                ));
            }
        }

        Ok(())
    }
}
