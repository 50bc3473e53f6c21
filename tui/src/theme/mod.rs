//! Theme and Colors
//!
//! Magic Man's palette: deep purple robes, a starry hat, a long white beard,
//! and a puff of violet smoke when he arrives. UI accents follow the same
//! purple/pink/emerald scheme.

use ratatui::style::Color;

// ============================================================================
// Magic Man Palette
// ============================================================================

/// Hat - deep wizard purple
pub const HAT_PURPLE: Color = Color::Rgb(106, 61, 184);

/// Hat brim - darker purple
pub const HAT_BRIM: Color = Color::Rgb(72, 38, 130);

/// Stars on the hat
pub const STAR_GOLD: Color = Color::Rgb(255, 214, 92);

/// Face
pub const SKIN: Color = Color::Rgb(240, 196, 160);

/// Eyes
pub const EYES: Color = Color::Rgb(30, 24, 48);

/// Beard - off-white
pub const BEARD: Color = Color::Rgb(236, 232, 244);

/// Mouth interior
pub const MOUTH: Color = Color::Rgb(120, 40, 70);

/// Poof smoke, light
pub const SMOKE_LIGHT: Color = Color::Rgb(214, 196, 255);

/// Poof smoke, mid
pub const SMOKE_MID: Color = Color::Rgb(170, 140, 235);

/// Poof smoke, dense
pub const SMOKE_DENSE: Color = Color::Rgb(128, 96, 210);

// ============================================================================
// UI Colors
// ============================================================================

/// Title and accents
pub const MAGIC_PURPLE: Color = Color::Rgb(168, 85, 247);

/// Orb while a conversation is running
pub const ORB_PINK: Color = Color::Rgb(236, 72, 153);

/// Connected badge
pub const EMERALD: Color = Color::Rgb(16, 185, 129);

/// Speaking badge
pub const SPEAKING_AMBER: Color = Color::Rgb(251, 191, 36);

/// Visitor's transcript lines
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(110, 110, 120);

/// Error banner
pub const ERROR_RED: Color = Color::Rgb(248, 113, 113);

/// Dismissal banner
pub const DISMISSAL_ORANGE: Color = Color::Rgb(251, 146, 60);
