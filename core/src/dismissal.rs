//! Dismissal Heuristics
//!
//! Best-effort detection that Magic Man ended the conversation on his own.
//! Two paths raise the same banner:
//!
//! - an agent-initiated disconnect after the agent has spoken
//! - a dismissive agent line, followed within the check delay by the session
//!   having ended
//!
//! Both are cosmetic. The keyword path races the real disconnect event, so
//! the controller never raises more than one signal per session generation.

use std::time::{Duration, Instant};

/// Banner text
pub const DISMISSAL_TEXT: &str = "Magic Man hung up";

/// A visible "the agent hung up" notice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DismissalSignal {
    /// Session generation the signal belongs to
    pub generation: u64,
    /// When it was raised
    pub raised_at: Instant,
    /// When it clears
    pub until: Instant,
}

impl DismissalSignal {
    /// Raise a signal that lasts `duration`
    pub fn raise(generation: u64, now: Instant, duration: Duration) -> Self {
        Self {
            generation,
            raised_at: now,
            until: now + duration,
        }
    }

    /// Whether the banner is still up at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.until
    }

    /// Banner text
    pub fn text(&self) -> &'static str {
        DISMISSAL_TEXT
    }
}

/// A scheduled look at the session after a dismissive line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingCheck {
    /// Session generation that produced the line
    pub generation: u64,
    /// When to look
    pub due: Instant,
}

impl PendingCheck {
    /// Whether the check should run at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }
}

/// Case-insensitive substring matcher for dismissive agent lines
#[derive(Clone, Debug)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher; blank keywords are ignored
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// First keyword found in `text`, if any
    pub fn find(&self, text: &str) -> Option<&str> {
        let lowered = normalize_apostrophes(&text.to_lowercase());
        self.keywords
            .iter()
            .find(|k| lowered.contains(normalize_apostrophes(k).as_str()))
            .map(String::as_str)
    }

    /// Whether `text` contains any keyword
    pub fn is_dismissive(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

/// Transcripts often use typographic apostrophes ("can’t")
fn normalize_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}
