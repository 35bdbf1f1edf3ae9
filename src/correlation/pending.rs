//! One-shot completion plumbing.
//!
//! A [`CompletionSink`] is consumed by value when it fires, so a pending
//! operation cannot be resolved twice. The paired [`CompletionHandle`] is the
//! future the dispatching caller suspends on.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::CorrelationKey;
use crate::error::{DispatchError, Result};

/// Sending half of a pending completion
#[derive(Debug)]
pub struct CompletionSink<T> {
    sender: oneshot::Sender<Result<T>>,
}

impl<T> CompletionSink<T> {
    /// Deliver the outcome. Returns `false` if the caller stopped waiting.
    pub fn complete(self, outcome: Result<T>) -> bool {
        self.sender.send(outcome).is_ok()
    }

    /// Whether the waiting caller dropped its handle
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Future resolving to the outcome of one dispatched operation
#[derive(Debug)]
pub struct CompletionHandle<T> {
    key: CorrelationKey,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> CompletionHandle<T> {
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }
}

impl<T> Future for CompletionHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sink dropped without firing: the registry entry was evicted
            Poll::Ready(Err(_)) => Poll::Ready(Err(DispatchError::abandoned(this.key.as_str()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create a connected sink/handle pair for `key`
pub fn completion_channel<T>(key: CorrelationKey) -> (CompletionSink<T>, CompletionHandle<T>) {
    let (sender, receiver) = oneshot::channel();
    (CompletionSink { sender }, CompletionHandle { key, receiver })
}

/// One outstanding dispatched operation awaiting exactly one terminal event
#[derive(Debug)]
pub struct PendingCompletion<T> {
    key: CorrelationKey,
    sink: CompletionSink<T>,
    registered_at: Instant,
    registered_at_utc: DateTime<Utc>,
}

impl<T> PendingCompletion<T> {
    pub fn new(key: CorrelationKey, sink: CompletionSink<T>) -> Self {
        Self {
            key,
            sink,
            registered_at: Instant::now(),
            registered_at_utc: Utc::now(),
        }
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at_utc
    }

    /// Whether the caller is still waiting on the other end
    pub fn is_awaited(&self) -> bool {
        !self.sink.is_closed()
    }

    /// Fire the sink, consuming this entry
    pub fn complete(self, outcome: Result<T>) -> bool {
        self.sink.complete(outcome)
    }
}
