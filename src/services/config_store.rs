use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::dispatch::ParameterMap;
use crate::error::Result;

/// Persistent operator configuration, addressed by group path
#[async_trait]
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    /// Fetch a configuration group, `None` if it was never stored
    async fn get_group(&self, path: &str) -> Result<Option<ParameterMap>>;
}

/// Configuration store held in memory
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    groups: RwLock<HashMap<String, ParameterMap>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_group(&self, path: impl Into<String>, group: ParameterMap) {
        self.groups.write().insert(path.into(), group);
    }

    pub fn remove_group(&self, path: &str) -> Option<ParameterMap> {
        self.groups.write().remove(path)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_group(&self, path: &str) -> Result<Option<ParameterMap>> {
        Ok(self.groups.read().get(path).cloned())
    }
}
