//! # Messaging Module
//!
//! Command publishing and completion message decoding for the worker bus.

pub mod bus;
pub mod message;

pub use bus::{InMemoryMessageBus, MessageBus};
pub use message::{CompletionEvent, InboundMessage, MessageLayout, OutboundCommand};
