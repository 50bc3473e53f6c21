//! Magic Man Sprites
//!
//! One picture per [`FrameId`]: two mouth-closed idle frames (the second
//! blinks), four mouth-open talking frames, and two frames of violet smoke
//! for the poof.

use ratatui::style::Color;

use magic_core::FrameId;

use super::sprites::{build_frame, Frame, SpriteBook};
use crate::theme::{
    BEARD, EYES, HAT_BRIM, HAT_PURPLE, MOUTH, SKIN, SMOKE_DENSE, SMOKE_LIGHT, SMOKE_MID,
    STAR_GOLD,
};

const PALETTE: &[(char, char, Color)] = &[
    ('H', '█', HAT_PURPLE),
    ('B', '▀', HAT_BRIM),
    ('*', '✦', STAR_GOLD),
    ('F', '█', SKIN),
    ('e', '●', EYES),
    ('b', '─', EYES),
    ('W', '█', BEARD),
    ('w', '▓', BEARD),
    ('m', '▄', MOUTH),
    ('M', '█', MOUTH),
    ('c', '░', SMOKE_LIGHT),
    ('C', '▒', SMOKE_MID),
    ('S', '▓', SMOKE_DENSE),
];

// ============================================================================
// Patterns
// ============================================================================

const HAT: [&str; 5] = [
    "        HH        ",
    "       HHHH       ",
    "      HH*HHH      ",
    "     HHHHHH*H     ",
    "   BBBBBBBBBBBB   ",
];

const EYES_OPEN: &str = "     FeFFFFFeF    ";
const EYES_SHUT: &str = "     FbFFFFFbF    ";
const FACE: &str = "     FFFFFFFFF    ";

const BEARD_TAIL: [&str; 2] = [
    "     wWWWWWWWw    ",
    "       WWWWW      ",
];

fn face(eyes: &'static str, mouth: [&'static str; 2]) -> Vec<&'static str> {
    let mut rows: Vec<&'static str> = HAT.to_vec();
    rows.extend([FACE, eyes, FACE]);
    rows.extend(mouth);
    rows.extend(BEARD_TAIL);
    rows
}

const MOUTH_CLOSED: [&str; 2] = [
    "    WWWmmmmmWWW   ",
    "    WWWWWWWWWWW   ",
];

const MOUTH_OPEN_A: [&str; 2] = [
    "    WWWmMMMmWWW   ",
    "    WWWWWWWWWWW   ",
];

const MOUTH_OPEN_B: [&str; 2] = [
    "    WWWMMMMMWWW   ",
    "    WWWWMMMWWWW   ",
];

const MOUTH_OPEN_C: [&str; 2] = [
    "    WWWWMMMWWWW   ",
    "    WWWWWMWWWWW   ",
];

const MOUTH_OPEN_D: [&str; 2] = [
    "    WWWMMMMMWWW   ",
    "    WWWWWWWWWWW   ",
];

const POOF_SMALL: [&str; 12] = [
    "                  ",
    "                  ",
    "                  ",
    "        **        ",
    "      cCCCCc      ",
    "     cCSSSSCc     ",
    "     cCSSSSCc     ",
    "      cCCCCc      ",
    "        **        ",
    "                  ",
    "                  ",
    "                  ",
];

const POOF_LARGE: [&str; 12] = [
    "                  ",
    "   *          *   ",
    "      cc  cc      ",
    "    cCCCccCCCc    ",
    "   cCCSSSSSSCCc   ",
    "  *cCSSSSSSSSCc*  ",
    "   cCSSSSSSSSCc   ",
    "   cCCSSSSSSCCc   ",
    "    cCCCccCCCc    ",
    "      cc  cc      ",
    "   *          *   ",
    "                  ",
];

/// Build the frame for one id
pub fn frame_for(id: FrameId) -> Frame {
    let rows = match id {
        FrameId::MouthClosedA => face(EYES_OPEN, MOUTH_CLOSED),
        FrameId::MouthClosedB => face(EYES_SHUT, MOUTH_CLOSED),
        FrameId::MouthOpenA => face(EYES_OPEN, MOUTH_OPEN_A),
        FrameId::MouthOpenB => face(EYES_OPEN, MOUTH_OPEN_B),
        FrameId::MouthOpenC => face(EYES_OPEN, MOUTH_OPEN_C),
        FrameId::MouthOpenD => face(EYES_OPEN, MOUTH_OPEN_D),
        FrameId::PoofA => POOF_SMALL.to_vec(),
        FrameId::PoofB => POOF_LARGE.to_vec(),
    };
    build_frame(&rows, PALETTE)
}

/// Every frame id the animator can ask for
pub const ALL_FRAMES: [FrameId; 8] = [
    FrameId::MouthClosedA,
    FrameId::MouthClosedB,
    FrameId::MouthOpenA,
    FrameId::MouthOpenB,
    FrameId::MouthOpenC,
    FrameId::MouthOpenD,
    FrameId::PoofA,
    FrameId::PoofB,
];

/// The full Magic Man sprite book
pub fn sprite_book() -> SpriteBook {
    SpriteBook::new(ALL_FRAMES.into_iter().map(|id| (id, frame_for(id))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use magic_core::animator::{MOUTH_CLOSED_FRAMES, MOUTH_OPEN_FRAMES, POOF_FRAMES};

    #[test]
    fn test_every_animator_frame_has_a_sprite() {
        let book = sprite_book();
        for id in MOUTH_CLOSED_FRAMES
            .iter()
            .chain(MOUTH_OPEN_FRAMES.iter())
            .chain(POOF_FRAMES.iter())
        {
            assert!(book.get(*id).is_some(), "missing sprite for {id:?}");
        }
        assert_eq!(book.len(), ALL_FRAMES.len());
    }

    #[test]
    fn test_frames_share_one_size() {
        let book = sprite_book();
        let (w, h) = book.max_bounds();
        for id in ALL_FRAMES {
            let frame = book.get(id).unwrap();
            assert_eq!((frame.width, frame.height), (w, h), "{id:?}");
        }
    }

    #[test]
    fn test_patterns_use_only_palette_keys() {
        for id in ALL_FRAMES {
            let frame = frame_for(id);
            for row in &frame.cells {
                for cell in row {
                    assert!(
                        cell.is_empty() || cell.fg != Color::Reset,
                        "{id:?} has unmapped glyph {:?}",
                        cell.ch
                    );
                }
            }
        }
    }

    #[test]
    fn test_talking_frames_differ() {
        let frames: Vec<Frame> = MOUTH_OPEN_FRAMES.iter().map(|id| frame_for(*id)).collect();
        for (i, a) in frames.iter().enumerate() {
            for b in frames.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
