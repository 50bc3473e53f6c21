//! Voice Channel Abstraction
//!
//! Trait definitions for the real-time duplex connection to the hosted agent.
//! The Session Controller only ever sees this trait, so the demo script,
//! the WebSocket service and test doubles are interchangeable.
//!
//! # Contract
//!
//! - `open` receives the agent id and the sending half of a fresh per-session
//!   event queue. Events must be pushed in the order they happen.
//! - `status` and `is_speaking` are live reads, cheap enough to call every
//!   frame.
//! - `close` stops all background work belonging to the channel.

pub mod scripted;
#[cfg(feature = "websocket")]
pub mod websocket;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::events::EventSender;
use crate::session::ConnectionStatus;

pub use scripted::{Script, ScriptCue, ScriptStep, ScriptedChannel};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketChannel;

/// Real-time voice channel to the hosted agent
#[async_trait]
pub trait VoiceChannel: Send {
    /// Channel name for logs (e.g. "websocket", "scripted")
    fn name(&self) -> &str;

    /// Open a connection to `agent_id`, delivering events into `events`
    async fn open(&mut self, agent_id: &str, events: EventSender) -> Result<(), ChannelError>;

    /// Close the connection and stop background work
    async fn close(&mut self) -> Result<(), ChannelError>;

    /// Live connection status
    fn status(&self) -> ConnectionStatus;

    /// Live "agent is speaking" flag
    fn is_speaking(&self) -> bool;

    /// Send a typed user turn
    async fn send_text(&mut self, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::TextUnsupported)
    }
}

#[async_trait]
impl<C: VoiceChannel + ?Sized> VoiceChannel for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn open(&mut self, agent_id: &str, events: EventSender) -> Result<(), ChannelError> {
        (**self).open(agent_id, events).await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        (**self).close().await
    }

    fn status(&self) -> ConnectionStatus {
        (**self).status()
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }

    async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        (**self).send_text(text).await
    }
}

/// Live properties shared between a channel and its background tasks
#[derive(Debug, Default)]
pub struct LiveState {
    connected: AtomicBool,
    speaking: AtomicBool,
}

impl LiveState {
    /// Mark connected or disconnected; disconnecting also stops speech
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        if !connected {
            self.speaking.store(false, Ordering::SeqCst);
        }
    }

    /// Mark the agent as speaking or silent
    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::SeqCst);
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    /// Current speaking flag
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}
