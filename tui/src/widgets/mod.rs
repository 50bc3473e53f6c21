//! Widgets
//!
//! Small borderless widgets drawn into compositor layers.

pub mod orb;
pub mod transcript;

pub use orb::{Orb, OrbState};
pub use transcript::{TranscriptState, TranscriptView};
