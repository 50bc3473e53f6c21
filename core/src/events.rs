//! Channel Events
//!
//! Events delivered by a voice channel to the Session Controller. These are
//! the only way the hosted agent talks to the rest of the system.
//!
//! # Ordering
//!
//! Each session gets its own queue. Events are handled strictly in the order
//! the channel pushed them, and never coalesced.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Capacity of the per-session event queue
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Who produced a transcript line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The visitor
    User,
    /// The hosted agent (Magic Man)
    Agent,
}

impl Source {
    /// Label used when rendering transcript lines
    pub fn label(&self) -> &'static str {
        match self {
            Source::User => "You",
            Source::Agent => "Magic Man",
        }
    }
}

/// Events from a voice channel to the Session Controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// The channel finished its handshake with the agent
    Connect,
    /// The channel closed, for any reason
    Disconnect,
    /// A transcript line from either side
    Message {
        /// Transcript text
        text: String,
        /// Who said it
        source: Source,
    },
    /// The channel reported a mid-session error
    Error {
        /// Error description from the channel
        message: String,
    },
}

impl ChannelEvent {
    /// Shorthand for an agent message
    pub fn agent(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            source: Source::Agent,
        }
    }

    /// Shorthand for a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            source: Source::User,
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Message { .. } => "message",
            Self::Error { .. } => "error",
        }
    }
}

/// Sending half handed to a channel on `open`
pub type EventSender = mpsc::Sender<ChannelEvent>;

/// Receiving half kept by the controller
pub type EventReceiver = mpsc::Receiver<ChannelEvent>;

/// Create a fresh per-session event queue
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_QUEUE_CAPACITY)
}
