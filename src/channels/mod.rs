//! Messaging-channel abstraction.
//!
//! The channel adapter is an opaque capability: it can send a text to a
//! recipient and it emits lifecycle + inbound-message events. Its internal
//! protocol (pairing, session persistence) lives behind this trait.

pub mod console;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

pub use console::ConsoleChannel;

/// An event emitted by the channel session.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A pairing challenge was issued; the operator must complete it.
    Paired { challenge: String },
    /// The session is connected and can send.
    SessionReady,
    /// The session dropped.
    SessionLost { reason: String },
    /// An inbound message from a contact.
    Inbound {
        sender_id: String,
        text: String,
        display_name: String,
    },
}

/// Stream of channel events.
pub type ChannelEventStream = Pin<Box<dyn Stream<Item = ChannelEvent> + Send>>;

/// A messaging-channel session.
///
/// Send failures are transient from the worker's point of view: the
/// dispatcher makes exactly one attempt per contact per cycle and leaves
/// failed contacts for a later cycle.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Start the session and return its event stream.
    async fn start(&self) -> Result<ChannelEventStream, ChannelError>;

    /// Send a text message to a recipient.
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ChannelError>;
}
