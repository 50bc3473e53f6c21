//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! These are derived from the session controller's snapshot and transcript
//! and used for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client": the controller decides, the TUI renders.
//! Display state is the bridge between a [`SessionSnapshot`] and the
//! widgets, so rendering never reaches into the controller directly.

use magic_core::{ConnectionStatus, ErrorKind, SessionSnapshot, Source, TranscriptLine};

use crate::widgets::OrbState;

/// A rendered transcript line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayLine {
    /// Who said it
    pub source: Source,
    /// What was said
    pub text: String,
}

impl DisplayLine {
    /// Create a display line
    pub fn new(source: Source, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    /// Speaker prefix
    pub fn prefix(&self) -> String {
        format!("{}: ", self.source.label())
    }

    /// Prefixed text
    pub fn rendered(&self) -> String {
        format!("{}{}", self.prefix(), self.text)
    }

    /// Whether Magic Man said it
    pub fn is_agent(&self) -> bool {
        self.source == Source::Agent
    }
}

impl From<&TranscriptLine> for DisplayLine {
    fn from(line: &TranscriptLine) -> Self {
        Self::new(line.source, line.text.clone())
    }
}

/// Which banner is showing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerKind {
    /// Magic Man hung up
    Dismissal,
    /// A session error
    Error(ErrorKind),
}

/// A banner to display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayBanner {
    /// Banner category
    pub kind: BannerKind,
    /// Banner text
    pub text: String,
}

/// The full display state for the TUI
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Connection badge
    pub status: ConnectionStatus,
    /// Speaking badge
    pub speaking: bool,
    /// Session running
    pub active: bool,
    /// Character should be on screen
    pub visible: bool,
    /// A start is in flight
    pub connecting: bool,
    /// Dismissal banner text
    pub dismissal: Option<&'static str>,
    /// Error banner
    pub error: Option<(ErrorKind, String)>,
    /// Session counter
    pub generation: u64,
    /// Transcript, oldest first
    pub lines: Vec<DisplayLine>,
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a controller snapshot
    pub fn apply_snapshot(&mut self, snapshot: &SessionSnapshot) {
        self.status = snapshot.status;
        self.speaking = snapshot.speaking;
        self.active = snapshot.active;
        self.visible = snapshot.visible;
        self.dismissal = snapshot.dismissal;
        self.error = snapshot.error_kind.zip(snapshot.error_message.clone());
        self.generation = snapshot.generation;
        if snapshot.active {
            self.connecting = false;
        }
    }

    /// Replace the transcript; returns whether lines were added
    pub fn set_transcript<'a>(
        &mut self,
        lines: impl IntoIterator<Item = &'a TranscriptLine>,
    ) -> bool {
        let lines: Vec<DisplayLine> = lines.into_iter().map(DisplayLine::from).collect();
        let grew = lines.len() > self.lines.len()
            || (!lines.is_empty() && lines.last() != self.lines.last());
        self.lines = lines;
        grew
    }

    /// Mark a start as in flight or settled
    pub fn set_connecting(&mut self, connecting: bool) {
        self.connecting = connecting;
    }

    /// What the orb should show
    pub fn orb_state(&self) -> OrbState {
        if self.active {
            OrbState::Active
        } else if self.connecting {
            OrbState::Connecting
        } else {
            OrbState::Idle
        }
    }

    /// Banners to show, dismissal first
    pub fn banners(&self) -> Vec<DisplayBanner> {
        let mut banners = Vec::new();
        if let Some(text) = self.dismissal {
            banners.push(DisplayBanner {
                kind: BannerKind::Dismissal,
                text: text.to_string(),
            });
        }
        if let Some((kind, text)) = &self.error {
            banners.push(DisplayBanner {
                kind: BannerKind::Error(*kind),
                text: text.clone(),
            });
        }
        banners
    }
}
