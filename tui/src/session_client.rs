//! Session Client
//!
//! Thin wrapper around the [`SessionController`] for TUI integration.
//! It picks the voice channel and microphone from configuration and gives
//! the app a small surface: start, end, toggle, send text, tick, snapshot.
//!
//! # Architecture
//!
//! The TUI is a "thin client": it holds no session logic. The client
//! owns the controller; the app turns keys into calls here and renders the
//! snapshot that comes back.

use std::time::Instant;

use magic_core::{
    microphone_for, ChannelError, ChannelKind, MagicConfig, Microphone, Script, ScriptedChannel,
    SessionController, SessionError, SessionSnapshot, TranscriptLine, VoiceChannel,
    WebSocketChannel,
};

/// Controller with the channel and microphone chosen at runtime
pub type DynController = SessionController<Box<dyn VoiceChannel>, Box<dyn Microphone>>;

/// Client for driving Magic Man sessions from the TUI
pub struct SessionClient {
    controller: DynController,
}

impl SessionClient {
    /// Build a client from configuration
    pub fn new(config: MagicConfig) -> Self {
        let channel: Box<dyn VoiceChannel> = match config.channel.kind {
            ChannelKind::Websocket => {
                Box::new(WebSocketChannel::new(config.channel.endpoint.clone()))
            }
            ChannelKind::Scripted => Box::new(ScriptedChannel::new(Script::magic_man_demo())),
        };
        let microphone = microphone_for(config.microphone.policy);
        Self::with_parts(config, channel, microphone)
    }

    /// Build a client around explicit parts
    pub fn with_parts(
        config: MagicConfig,
        channel: Box<dyn VoiceChannel>,
        microphone: Box<dyn Microphone>,
    ) -> Self {
        tracing::debug!(channel = channel.name(), "Session client created");
        Self {
            controller: SessionController::new(config, channel, microphone),
        }
    }

    /// Start a session
    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.controller.start_session().await
    }

    /// Release the channel after an interrupted start
    pub async fn abandon_start(&mut self) {
        self.controller.abandon_start().await;
    }

    /// Close the channel after Magic Man hung up
    pub async fn release_channel(&mut self) {
        self.controller.release_channel().await;
    }

    /// Whether a hung-up session still holds the channel
    pub fn needs_release(&self) -> bool {
        self.controller.needs_release()
    }

    /// End the current session
    pub async fn end(&mut self) -> Result<(), SessionError> {
        self.controller.end_session().await
    }

    /// Start when idle, end when active (the orb)
    pub async fn toggle(&mut self) -> Result<(), SessionError> {
        if self.controller.is_active() {
            self.end().await
        } else {
            self.start().await
        }
    }

    /// Send a typed user turn
    pub async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        self.controller.send_text(text).await
    }

    /// Advance the controller to now
    pub fn tick(&mut self) {
        self.controller.tick(Instant::now());
    }

    /// Read-only view for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot()
    }

    /// Transcript lines, oldest first
    pub fn transcript(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.controller.session().transcript()
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.controller.is_active()
    }

    /// Active configuration
    pub fn config(&self) -> &MagicConfig {
        self.controller.config()
    }

    /// Voice channel name
    pub fn channel_name(&self) -> &str {
        self.controller.channel().name()
    }

    /// Dismiss the error banner
    pub fn clear_error(&mut self) {
        self.controller.clear_error();
    }
}
