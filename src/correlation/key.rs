use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier linking a dispatched command to its asynchronous reply
///
/// Usually the caller's connection or session identifier. At most one
/// operation may be outstanding per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh key for callers without a session identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CorrelationKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CorrelationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CorrelationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
