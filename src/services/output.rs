//! Caller-facing output: where rendered artifacts and error text are sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

use crate::error::Result;

/// Channel back to the user who issued the command
#[async_trait]
pub trait OutputChannel: Send + Sync + std::fmt::Debug {
    async fn send_response(&self, artifact: &str, attachments: &[Value], scope: &str) -> Result<()>;

    async fn send_error(&self, message: &str, scope: &str) -> Result<()>;
}

/// Public base URL used to compose reachable asset paths
pub trait BaseUrlProvider: Send + Sync + std::fmt::Debug {
    fn base_url(&self) -> String;
}

/// Fixed base URL, always ending in `/`
#[derive(Debug, Clone)]
pub struct StaticBaseUrl(String);

impl StaticBaseUrl {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self(base_url)
    }
}

impl BaseUrlProvider for StaticBaseUrl {
    fn base_url(&self) -> String {
        self.0.clone()
    }
}

/// Something sent through an [`OutputChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRecord {
    Response {
        artifact: String,
        attachments: Vec<Value>,
        scope: String,
    },
    Error {
        message: String,
        scope: String,
    },
}

impl OutputRecord {
    pub fn scope(&self) -> &str {
        match self {
            Self::Response { scope, .. } | Self::Error { scope, .. } => scope,
        }
    }
}

/// Output channel that keeps everything it was asked to send
#[derive(Debug, Default)]
pub struct RecordingOutputChannel {
    records: Mutex<Vec<OutputRecord>>,
}

impl RecordingOutputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, scope: &str) -> Vec<OutputRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.scope() == scope)
            .cloned()
            .collect()
    }

    pub fn errors_for(&self, scope: &str) -> Vec<String> {
        self.records_for(scope)
            .into_iter()
            .filter_map(|r| match r {
                OutputRecord::Error { message, .. } => Some(message),
                OutputRecord::Response { .. } => None,
            })
            .collect()
    }

    pub fn responses_for(&self, scope: &str) -> Vec<String> {
        self.records_for(scope)
            .into_iter()
            .filter_map(|r| match r {
                OutputRecord::Response { artifact, .. } => Some(artifact),
                OutputRecord::Error { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl OutputChannel for RecordingOutputChannel {
    async fn send_response(&self, artifact: &str, attachments: &[Value], scope: &str) -> Result<()> {
        info!(scope = %scope, bytes = artifact.len(), "📨 Response sent");
        self.records.lock().push(OutputRecord::Response {
            artifact: artifact.to_string(),
            attachments: attachments.to_vec(),
            scope: scope.to_string(),
        });
        Ok(())
    }

    async fn send_error(&self, message: &str, scope: &str) -> Result<()> {
        info!(scope = %scope, message = %message, "📨 Error sent");
        self.records.lock().push(OutputRecord::Error {
            message: message.to_string(),
            scope: scope.to_string(),
        });
        Ok(())
    }
}
