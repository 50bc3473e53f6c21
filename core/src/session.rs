//! Session State
//!
//! The single owned state object for a conversation. Flags such as "has the
//! agent spoken yet" and "was this end user-initiated" are plain fields here.
//! Handlers read them through `&mut Session`, so delayed checks always see
//! live values rather than copies taken when the check was scheduled.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, SessionError};
use crate::events::Source;

/// Channel connection status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No open channel
    #[default]
    Disconnected,
    /// Channel handshake done
    Connected,
}

impl ConnectionStatus {
    /// Badge text
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "OFFLINE",
            Self::Connected => "CONNECTED",
        }
    }
}

/// Who ended a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndCause {
    /// The visitor pressed stop
    User,
    /// The channel closed without a user request
    Agent,
}

/// One line of conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Who said it
    pub source: Source,
    /// What was said
    pub text: String,
}

/// Conversation session state
#[derive(Clone, Debug)]
pub struct Session {
    /// Channel connection status
    pub connection_status: ConnectionStatus,
    /// Agent is currently producing speech
    pub speaking: bool,
    /// The visitor has an open session
    pub active: bool,
    /// Most recent failure, shown until cleared
    pub last_error: Option<SessionError>,
    /// The character should be on screen
    pub visible: bool,
    /// The agent has spoken at least once this session
    pub has_spoken: bool,
    /// The current end was requested by the visitor
    pub user_initiated_end: bool,
    /// Monotonic session counter (0 = no session yet)
    pub generation: u64,
    /// Log correlation id of the current or last session
    pub session_id: Option<Uuid>,
    /// How the most recent session ended (`None` while running)
    pub ended_by: Option<EndCause>,
    transcript: VecDeque<TranscriptLine>,
    transcript_limit: usize,
}

impl Session {
    /// Create an idle session state
    pub fn new(transcript_limit: usize) -> Self {
        Self {
            connection_status: ConnectionStatus::Disconnected,
            speaking: false,
            active: false,
            last_error: None,
            visible: false,
            has_spoken: false,
            user_initiated_end: false,
            generation: 0,
            session_id: None,
            ended_by: None,
            transcript: VecDeque::new(),
            transcript_limit: transcript_limit.max(1),
        }
    }

    /// Begin a new session generation
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.session_id = Some(Uuid::new_v4());
        self.active = true;
        self.last_error = None;
        self.has_spoken = false;
        self.user_initiated_end = false;
        self.visible = false;
        self.speaking = false;
        self.ended_by = None;
        self.transcript.clear();
        self.generation
    }

    /// Reset the per-session flags after an end
    pub fn reset_flags(&mut self) {
        self.active = false;
        self.visible = false;
        self.has_spoken = false;
        self.speaking = false;
        self.connection_status = ConnectionStatus::Disconnected;
    }

    /// Record a transcript line, dropping the oldest beyond the limit
    pub fn push_transcript(&mut self, source: Source, text: impl Into<String>) {
        if self.transcript.len() >= self.transcript_limit {
            self.transcript.pop_front();
        }
        self.transcript.push_back(TranscriptLine {
            source,
            text: text.into(),
        });
    }

    /// Transcript lines, oldest first
    pub fn transcript(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.transcript.iter()
    }

    /// Number of transcript lines kept
    pub fn transcript_len(&self) -> usize {
        self.transcript.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Read-only view of the controller for rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Connection badge
    pub status: ConnectionStatus,
    /// Agent speaking
    pub speaking: bool,
    /// Session running
    pub active: bool,
    /// Character should be on screen
    pub visible: bool,
    /// Dismissal banner text, while up
    pub dismissal: Option<&'static str>,
    /// Error category, if any
    pub error_kind: Option<ErrorKind>,
    /// Error banner text, if any
    pub error_message: Option<String>,
    /// Session counter
    pub generation: u64,
}
