//! Session Controller
//!
//! Owns the conversation lifecycle against a [`VoiceChannel`] and derives the
//! presentation flags (`visible`, dismissal banner) from the channel's event
//! stream.
//!
//! # Design Philosophy
//!
//! The controller is a plain owned struct driven from one loop:
//!
//! ```text
//! start_session() ──► channel.open(agent_id, tx) ──► channel task
//!                                                        │
//!                                 per-session mpsc queue │
//!                                                        ▼
//! tick(now) ◄── drain in order ◄─────────────────────── events
//!    │
//!    ├── resolve keyword checks
//!    ├── expire dismissal banner
//!    └── refresh speaking from the channel
//! ```
//!
//! Time is passed in as `now` so every rule can be exercised without a
//! clock. Each session gets its own queue; when a session ends its receiver
//! is dropped, so nothing from an old connection can reach a new one.
//!
//! # Hang-ups
//!
//! A `Disconnect` after the agent has spoken raises the banner at once.
//! Since a dismissive line always counts as speech, that path normally wins
//! and the delayed keyword check only confirms it. The check stays as a
//! backstop: it raises the banner only if the session ended without the
//! visitor and nothing was raised for that generation yet.
//!
//! A session the agent ended still holds an open channel. The owner calls
//! [`SessionController::release_channel`] from its loop, and
//! `start_session` releases it before opening again.

use std::time::Instant;

use tokio::sync::mpsc::error::TryRecvError;

use crate::channel::VoiceChannel;
use crate::config::MagicConfig;
use crate::dismissal::{DismissalSignal, KeywordMatcher, PendingCheck};
use crate::error::{ChannelError, SessionError};
use crate::events::{event_queue, ChannelEvent, EventReceiver, Source};
use crate::microphone::Microphone;
use crate::session::{ConnectionStatus, EndCause, Session, SessionSnapshot};

/// Conversation lifecycle controller
pub struct SessionController<C: VoiceChannel, M: Microphone> {
    config: MagicConfig,
    channel: C,
    microphone: M,
    session: Session,
    events: Option<EventReceiver>,
    matcher: KeywordMatcher,
    dismissal: Option<DismissalSignal>,
    last_dismissed_generation: Option<u64>,
    pending_check: Option<PendingCheck>,
    needs_release: bool,
}

impl<C: VoiceChannel, M: Microphone> SessionController<C, M> {
    /// Create an idle controller
    pub fn new(config: MagicConfig, channel: C, microphone: M) -> Self {
        let matcher = KeywordMatcher::new(&config.dismissal.keywords);
        let session = Session::new(config.transcript_limit);
        Self {
            config,
            channel,
            microphone,
            session,
            events: None,
            matcher,
            dismissal: None,
            last_dismissed_generation: None,
            pending_check: None,
            needs_release: false,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a session.
    ///
    /// Asks for the microphone, then opens the channel within the configured
    /// connect timeout. Failures are recorded in `last_error` and returned;
    /// a second start while active is rejected without touching state.
    pub async fn start_session(&mut self) -> Result<(), SessionError> {
        if self.session.active {
            tracing::debug!(generation = self.session.generation, "Start ignored: session active");
            return Err(SessionError::AlreadyActive);
        }

        self.release_channel().await;

        if let Err(capture) = self.microphone.request_capture().await {
            return Err(self.fail_start(capture.into()));
        }

        let (tx, rx) = event_queue();
        let timeout = self.config.channel.connect_timeout();
        let agent_id = self.config.agent_id.clone();

        tracing::info!(
            channel = self.channel.name(),
            agent_id = %agent_id,
            "Opening voice channel"
        );

        match tokio::time::timeout(timeout, self.channel.open(&agent_id, tx)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(self.fail_start(err.into())),
            Err(_) => {
                if let Err(err) = self.channel.close().await {
                    tracing::debug!(error = %err, "Close after timed-out open failed");
                }
                return Err(self.fail_start(SessionError::ConnectionFailed {
                    reason: format!("no answer within {} ms", timeout.as_millis()),
                }));
            }
        }

        let generation = self.session.begin();
        self.events = Some(rx);
        self.dismissal = None;
        self.pending_check = None;

        tracing::info!(
            session_id = ?self.session.session_id,
            generation,
            "Session started"
        );
        Ok(())
    }

    fn fail_start(&mut self, err: SessionError) -> SessionError {
        tracing::warn!(error = %err, kind = ?err.kind(), "Session start failed");
        self.session.active = false;
        self.session.last_error = Some(err.clone());
        err
    }

    /// Release the channel after a start that was dropped before finishing.
    ///
    /// No-op while a session is active.
    pub async fn abandon_start(&mut self) {
        if self.session.active {
            return;
        }
        if let Err(err) = self.channel.close().await {
            tracing::debug!(error = %err, "Close after abandoned start failed");
        }
        self.needs_release = false;
        self.events = None;
        tracing::info!("Session start abandoned");
    }

    /// End the current session at the visitor's request.
    ///
    /// No-op when inactive. Local state is reset even when the channel
    /// fails to close; that failure is recorded and returned.
    pub async fn end_session(&mut self) -> Result<(), SessionError> {
        if !self.session.active {
            return Ok(());
        }

        self.session.user_initiated_end = true;
        self.pending_check = None;

        let closed = self.channel.close().await;
        self.needs_release = false;

        // Handle whatever the channel queued up to and including its close
        let now = Instant::now();
        self.drain_events(now);
        if self.session.active {
            self.finish(EndCause::User);
        }

        match closed {
            Ok(()) => {
                tracing::info!(generation = self.session.generation, "Session ended by user");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Channel close failed; session reset anyway");
                let err = SessionError::CloseFailed(err.to_string());
                self.session.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Close the channel of a session the agent ended.
    ///
    /// No-op unless the last session ended without a user request and the
    /// channel has not been closed since.
    pub async fn release_channel(&mut self) {
        if !self.needs_release {
            return;
        }
        self.needs_release = false;
        match self.channel.close().await {
            Ok(()) => tracing::debug!(
                generation = self.session.generation,
                "Channel released after hang-up"
            ),
            Err(err) => tracing::debug!(error = %err, "Release after hang-up failed"),
        }
    }

    /// Send a typed user turn
    pub async fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        if !self.session.active {
            return Err(ChannelError::NotOpen);
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.channel.send_text(text).await {
            tracing::warn!(error = %err, "Typed message not delivered");
            self.session.last_error = Some(SessionError::RuntimeChannelError(err.to_string()));
            return Err(err);
        }
        Ok(())
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Advance the controller to `now`
    pub fn tick(&mut self, now: Instant) {
        self.drain_events(now);
        self.resolve_pending_check(now);

        if self
            .dismissal
            .as_ref()
            .is_some_and(|signal| !signal.is_active(now))
        {
            tracing::debug!("Dismissal banner cleared");
            self.dismissal = None;
        }

        self.session.speaking = self.session.active && self.channel.is_speaking();
    }

    fn drain_events(&mut self, now: Instant) {
        loop {
            let Some(rx) = self.events.as_mut() else {
                break;
            };
            let event = match rx.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    if self.session.active {
                        tracing::warn!("Channel dropped its event queue without disconnecting");
                        self.handle_event(ChannelEvent::Disconnect, now);
                    }
                    break;
                }
            };
            self.handle_event(event, now);
        }
    }

    /// Apply one channel event
    pub fn handle_event(&mut self, event: ChannelEvent, now: Instant) {
        tracing::debug!(
            session_id = ?self.session.session_id,
            generation = self.session.generation,
            event = event.kind(),
            "Channel event"
        );

        match event {
            ChannelEvent::Connect => {
                self.session.connection_status = ConnectionStatus::Connected;
                self.session.last_error = None;
                tracing::info!(generation = self.session.generation, "Channel connected");
            }
            ChannelEvent::Disconnect => self.on_disconnect(now),
            ChannelEvent::Message { text, source } => self.on_message(text, source, now),
            ChannelEvent::Error { message } => {
                tracing::warn!(message = %message, "Channel reported an error");
                self.session.last_error = Some(SessionError::RuntimeChannelError(message));
            }
        }
    }

    fn on_disconnect(&mut self, now: Instant) {
        self.session.connection_status = ConnectionStatus::Disconnected;
        if !self.session.active {
            return;
        }

        let generation = self.session.generation;
        if !self.session.user_initiated_end && self.session.has_spoken {
            self.raise_dismissal(generation, now);
        }

        let cause = if self.session.user_initiated_end {
            EndCause::User
        } else {
            EndCause::Agent
        };
        tracing::info!(generation, cause = ?cause, "Channel disconnected");
        self.finish(cause);
    }

    fn on_message(&mut self, text: String, source: Source, now: Instant) {
        if !self.session.active {
            tracing::debug!("Message after session end dropped");
            return;
        }

        if source == Source::Agent {
            if !self.session.has_spoken {
                self.session.has_spoken = true;
                self.session.visible = true;
                tracing::info!(generation = self.session.generation, "Magic Man appears");
            }

            if let Some(keyword) = self.matcher.find(&text) {
                tracing::debug!(keyword, "Dismissive line; scheduling check");
                self.pending_check = Some(PendingCheck {
                    generation: self.session.generation,
                    due: now + self.config.dismissal.check_delay(),
                });
            }
        }

        self.session.push_transcript(source, text);
    }

    fn resolve_pending_check(&mut self, now: Instant) {
        let Some(check) = self.pending_check else {
            return;
        };
        if !check.is_due(now) {
            return;
        }
        self.pending_check = None;

        let ended_by_agent = check.generation == self.session.generation
            && !self.session.active
            && self.session.ended_by == Some(EndCause::Agent);
        if ended_by_agent {
            self.raise_dismissal(check.generation, now);
        }
    }

    fn raise_dismissal(&mut self, generation: u64, now: Instant) {
        if self.last_dismissed_generation == Some(generation) {
            return;
        }
        tracing::info!(generation, "Magic Man hung up");
        self.dismissal = Some(DismissalSignal::raise(
            generation,
            now,
            self.config.dismissal.display_duration(),
        ));
        self.last_dismissed_generation = Some(generation);
    }

    fn finish(&mut self, cause: EndCause) {
        self.session.reset_flags();
        self.session.user_initiated_end = false;
        self.session.ended_by = Some(cause);
        self.needs_release = cause == EndCause::Agent;
        self.events = None;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Read-only view for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.session.connection_status,
            speaking: self.session.speaking,
            active: self.session.active,
            visible: self.session.visible,
            dismissal: self.dismissal.as_ref().map(DismissalSignal::text),
            error_kind: self.session.last_error.as_ref().map(SessionError::kind),
            error_message: self.session.last_error.as_ref().map(SessionError::user_message),
            generation: self.session.generation,
        }
    }

    /// Session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.session.active
    }

    /// Current dismissal banner, if up
    pub fn dismissal(&self) -> Option<&DismissalSignal> {
        self.dismissal.as_ref()
    }

    /// Whether an agent-ended session still holds the channel
    pub fn needs_release(&self) -> bool {
        self.needs_release
    }

    /// Scheduled keyword check, if any
    pub fn pending_check(&self) -> Option<PendingCheck> {
        self.pending_check
    }

    /// Active configuration
    pub fn config(&self) -> &MagicConfig {
        &self.config
    }

    /// The voice channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Clear the error banner
    pub fn clear_error(&mut self) {
        self.session.last_error = None;
    }
}
