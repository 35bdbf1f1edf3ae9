//! # Correlation Registry
//!
//! Concurrent map from correlation key to the pending completion filed under
//! it. Entries are removed before their sink fires, so a completion delivered
//! twice (or concurrently) resolves the caller at most once.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::pending::{completion_channel, CompletionHandle, CompletionSink, PendingCompletion};
use super::CorrelationKey;
use crate::error::{DispatchError, Result};

/// Snapshot of registry state for monitoring and leak detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryMetrics {
    pub pending_count: usize,
    pub oldest_pending_age_ms: Option<u64>,
    pub oldest_key: Option<CorrelationKey>,
    /// Entries whose caller already dropped its handle
    pub abandoned_count: usize,
}

/// Registry of operations dispatched but not yet completed
pub struct CorrelationRegistry<T> {
    pending: DashMap<CorrelationKey, PendingCompletion<T>>,
}

impl<T> fmt::Debug for CorrelationRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("pending_count", &self.pending.len())
            .finish()
    }
}

impl<T> Default for CorrelationRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CorrelationRegistry<T> {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// File `sink` under `key`
    ///
    /// Fails with `DuplicateKey` if an operation is already pending for the
    /// key; the existing entry is left untouched.
    pub fn register(&self, key: CorrelationKey, sink: CompletionSink<T>) -> Result<()> {
        match self.pending.entry(key) {
            Entry::Occupied(existing) => {
                warn!(
                    correlation_key = %existing.key(),
                    "Refusing to register: completion already pending for key"
                );
                Err(DispatchError::duplicate_key(existing.key().as_str()))
            }
            Entry::Vacant(slot) => {
                let key = slot.key().clone();
                debug!(correlation_key = %key, "Registered pending completion");
                slot.insert(PendingCompletion::new(key, sink));
                Ok(())
            }
        }
    }

    /// Register a fresh pending completion and return the handle to await
    pub fn register_pending(&self, key: CorrelationKey) -> Result<CompletionHandle<T>> {
        let (sink, handle) = completion_channel(key.clone());
        self.register(key, sink)?;
        Ok(handle)
    }

    /// Resolve `key` as succeeded. Returns `false` if nothing was pending.
    pub fn resolve_success(&self, key: &str, result: T) -> bool {
        self.resolve(key, Ok(result))
    }

    /// Resolve `key` as failed with the worker's error strings
    pub fn resolve_failure(&self, key: &str, errors: Vec<String>) -> bool {
        self.resolve(key, Err(DispatchError::remote_failure(errors)))
    }

    /// Resolve `key` as failed with an arbitrary dispatch error
    pub fn resolve_error(&self, key: &str, error: DispatchError) -> bool {
        self.resolve(key, Err(error))
    }

    /// Remove the entry for `key` and hand it to the caller, unfired
    ///
    /// Of several concurrent takers of one key exactly one gets the entry and
    /// owns its resolution. The rest get `None`.
    pub fn take(&self, key: &str) -> Option<PendingCompletion<T>> {
        let taken = self.pending.remove(key).map(|(_, pending)| pending);
        if taken.is_some() {
            debug!(correlation_key = %key, "Took pending completion for resolution");
        }
        taken
    }

    fn resolve(&self, key: &str, outcome: Result<T>) -> bool {
        let Some((_, pending)) = self.pending.remove(key) else {
            warn!(
                correlation_key = %key,
                success = outcome.is_ok(),
                "No pending completion for key - duplicate or late delivery ignored"
            );
            return false;
        };

        let age_ms = pending.age().as_millis() as u64;
        let success = outcome.is_ok();
        if pending.complete(outcome) {
            debug!(
                correlation_key = %key,
                success = success,
                elapsed_ms = age_ms,
                "Pending completion resolved"
            );
        } else {
            debug!(
                correlation_key = %key,
                elapsed_ms = age_ms,
                "Pending completion resolved but caller is no longer waiting"
            );
        }
        true
    }

    /// Remove `key` without resolving it; the waiting handle sees `Abandoned`
    pub fn evict(&self, key: &str) -> bool {
        let evicted = self.pending.remove(key).is_some();
        if evicted {
            debug!(correlation_key = %key, "Evicted pending completion");
        }
        evicted
    }

    /// Resolve every entry older than `max_age` with a timeout error
    pub fn expire_older_than(&self, max_age: Duration) -> Vec<CorrelationKey> {
        // Collect first: removing while iterating would deadlock the shard
        let stale: Vec<CorrelationKey> = self
            .pending
            .iter()
            .filter(|entry| entry.value().age() > max_age)
            .map(|entry| entry.key().clone())
            .collect();

        let timeout_ms = max_age.as_millis() as u64;
        stale
            .into_iter()
            .filter(|key| {
                self.resolve(
                    key.as_str(),
                    Err(DispatchError::timeout(key.as_str(), timeout_ms)),
                )
            })
            .inspect(|key| warn!(correlation_key = %key, timeout_ms, "⏰ Expired stale pending completion"))
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of operations dispatched but not yet completed
    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_keys(&self) -> Vec<CorrelationKey> {
        self.pending.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn metrics(&self) -> RegistryMetrics {
        let mut metrics = RegistryMetrics::default();
        let mut oldest: Option<(Duration, CorrelationKey)> = None;

        for entry in self.pending.iter() {
            metrics.pending_count += 1;
            if !entry.value().is_awaited() {
                metrics.abandoned_count += 1;
            }
            let age = entry.value().age();
            if oldest
                .as_ref()
                .map_or(true, |(oldest_age, _)| age > *oldest_age)
            {
                oldest = Some((age, entry.key().clone()));
            }
        }

        if let Some((age, key)) = oldest {
            metrics.oldest_pending_age_ms = Some(age.as_millis() as u64);
            metrics.oldest_key = Some(key);
        }
        metrics
    }
}
