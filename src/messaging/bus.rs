//! # Message Bus
//!
//! Publishing side of the worker transport. Delivery of completions back to
//! the skill happens through the receiver handed to
//! `MusicGenerationSkill::spawn_completion_listener`.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::message::OutboundCommand;
use crate::error::Result;

/// Publishes commands to remote workers
#[async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug {
    async fn publish(&self, command: OutboundCommand) -> Result<()>;
}

/// In-process bus that records every published command and forwards it to subscribers
#[derive(Debug, Default)]
pub struct InMemoryMessageBus {
    published: Mutex<Vec<OutboundCommand>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<OutboundCommand>>>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every command published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<OutboundCommand> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    pub fn published(&self) -> Vec<OutboundCommand> {
        self.published.lock().clone()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, command: OutboundCommand) -> Result<()> {
        debug!(
            command_id = %command.command_id,
            exchange = %command.exchange,
            worker_id = %command.target.worker_id,
            command_name = %command.command_name,
            "📤 Publishing command"
        );

        self.published.lock().push(command.clone());
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(command.clone()).is_ok());
        Ok(())
    }
}
