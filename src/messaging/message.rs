//! # Message Structures
//!
//! Outbound commands published to worker exchanges and the inbound messages
//! workers send back when a command finishes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::constants::{self, completion};
use crate::correlation::CorrelationKey;
use crate::dispatch::CommandPayload;
use crate::error::{DispatchError, Result};
use crate::services::WorkerRef;

/// Command published to a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundCommand {
    pub command_id: Uuid,
    /// Exchange or topic the command is published on
    pub exchange: String,
    pub target: WorkerRef,
    pub command_name: String,
    pub payload: CommandPayload,
    /// Routing metadata, carries the correlation key
    pub headers: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl OutboundCommand {
    pub fn new(
        exchange: impl Into<String>,
        target: WorkerRef,
        command_name: impl Into<String>,
        payload: CommandPayload,
    ) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            exchange: exchange.into(),
            target,
            command_name: command_name.into(),
            payload,
            headers: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: Value) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    /// Correlation key carried under `header`, if it is a string
    pub fn correlation_key(&self, header: &str) -> Option<CorrelationKey> {
        self.headers
            .get(header)
            .and_then(Value::as_str)
            .map(CorrelationKey::from)
    }

    /// Convert to JSON for transport
    pub fn to_json(&self) -> std::result::Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Raw message delivered by the bus runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub headers: HashMap<String, Value>,
    pub content: Vec<u8>,
}

impl InboundMessage {
    pub fn new(headers: HashMap<String, Value>, content: Vec<u8>) -> Self {
        Self { headers, content }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: Value) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    /// Successful completion carrying base64-encoded audio, using the default header names
    pub fn success(key: impl Into<String>, audio: &[u8]) -> Self {
        let mut body = serde_json::Map::new();
        body.insert(
            completion::CONTENT_FIELD.to_string(),
            Value::String(STANDARD.encode(audio)),
        );
        Self::new(HashMap::new(), Value::Object(body).to_string().into_bytes())
            .with_header(constants::CORRELATION_HEADER, Value::String(key.into()))
            .with_header(completion::SUCCESS_HEADER, Value::Bool(true))
    }

    /// Failed completion carrying the worker's error strings, using the default header names
    pub fn failure(key: impl Into<String>, errors: &[&str]) -> Self {
        Self::new(HashMap::new(), Vec::new())
            .with_header(constants::CORRELATION_HEADER, Value::String(key.into()))
            .with_header(completion::SUCCESS_HEADER, Value::Bool(false))
            .with_header(completion::ERRORS_HEADER, serde_json::json!(errors))
    }
}

/// Header names and content field used to read completion messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLayout {
    pub correlation_header: String,
    pub success_header: String,
    pub errors_header: String,
    pub content_field: String,
}

impl MessageLayout {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            correlation_header: config.protocol.correlation_header.clone(),
            success_header: config.completion.success_header.clone(),
            errors_header: config.completion.errors_header.clone(),
            content_field: config.artifact.content_field.clone(),
        }
    }
}

impl Default for MessageLayout {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

/// Terminal event for one dispatched command
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub correlation_key: CorrelationKey,
    pub success: bool,
    pub errors: Vec<String>,
    pub content: Vec<u8>,
}

impl CompletionEvent {
    /// Read a completion event from an inbound message
    ///
    /// A missing correlation header is a `Decode` error. A missing or
    /// unrecognised success header counts as failure. The errors header may be
    /// a list of strings or a single string.
    pub fn from_message(message: &InboundMessage, layout: &MessageLayout) -> Result<Self> {
        let correlation_key = match message.headers.get(&layout.correlation_header) {
            Some(Value::String(key)) if !key.is_empty() => CorrelationKey::new(key.as_str()),
            Some(Value::Number(key)) => CorrelationKey::new(key.to_string()),
            _ => {
                return Err(DispatchError::decode(format!(
                    "completion message has no '{}' header",
                    layout.correlation_header
                )))
            }
        };

        let success = match message.headers.get(&layout.success_header) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        };

        let errors = match message.headers.get(&layout.errors_header) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(text)) => vec![text.clone()],
            _ => Vec::new(),
        };

        Ok(Self {
            correlation_key,
            success,
            errors,
            content: message.content.clone(),
        })
    }

    /// Decode the base64 audio held in the JSON content under `field`
    pub fn decode_audio(&self, field: &str) -> Result<Vec<u8>> {
        let body: Value = serde_json::from_slice(&self.content)
            .map_err(|e| DispatchError::decode(format!("completion content is not JSON: {e}")))?;

        let encoded = body
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::decode(format!("completion content has no '{field}' string")))?;

        STANDARD
            .decode(encoded.trim())
            .map_err(|e| DispatchError::decode(format!("'{field}' is not valid base64: {e}")))
    }
}
