//! Sprite Definitions
//!
//! Blocky pixel art using Unicode block elements and colors.
//! Each cell has its own foreground color. Timing lives in the core
//! animator, so frames here are pure pictures.

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::style::{Color, Style};

use magic_core::FrameId;

/// A single colored cell in a sprite
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColoredCell {
    /// The character to display
    pub ch: char,
    /// Foreground color
    pub fg: Color,
}

impl ColoredCell {
    /// Create a new colored cell
    pub const fn new(ch: char, fg: Color) -> Self {
        Self { ch, fg }
    }

    /// Empty/transparent cell
    pub const fn empty() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
        }
    }

    /// Check if cell is empty/transparent
    pub fn is_empty(&self) -> bool {
        self.ch == ' '
    }
}

/// A single picture with per-cell coloring
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// 2D grid of colored cells (row-major)
    pub cells: Vec<Vec<ColoredCell>>,
    /// Width in terminal cells
    pub width: u16,
    /// Height in terminal cells
    pub height: u16,
}

impl Frame {
    /// Create a frame from a grid of colored cells
    pub fn new(cells: Vec<Vec<ColoredCell>>) -> Self {
        let height = u16::try_from(cells.len()).unwrap_or(u16::MAX);
        let width = cells
            .iter()
            .map(|row| u16::try_from(row.len()).unwrap_or(u16::MAX))
            .max()
            .unwrap_or(0);

        Self {
            cells,
            width,
            height,
        }
    }

    /// Get cell at position (returns empty if out of bounds)
    pub fn get(&self, x: u16, y: u16) -> &ColoredCell {
        static EMPTY: ColoredCell = ColoredCell::empty();
        self.cells
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .unwrap_or(&EMPTY)
    }

    /// Draw centered in the buffer, skipping transparent cells
    pub fn draw_centered(&self, buf: &mut Buffer) {
        let area = buf.area;
        let x_offset = area.width.saturating_sub(self.width) / 2;
        let y_offset = area.height.saturating_sub(self.height) / 2;

        for (row_idx, row) in self.cells.iter().enumerate() {
            let y = area.y + y_offset + row_idx as u16;
            if y >= area.y + area.height {
                break;
            }
            for (col_idx, cell) in row.iter().enumerate() {
                let x = area.x + x_offset + col_idx as u16;
                if x >= area.x + area.width {
                    break;
                }
                if cell.is_empty() {
                    continue;
                }
                buf[(x, y)].set_char(cell.ch).set_style(Style::default().fg(cell.fg));
            }
        }
    }
}

/// Frames for every [`FrameId`]
pub struct SpriteBook {
    frames: HashMap<FrameId, Frame>,
}

impl SpriteBook {
    /// Build a book from (id, frame) pairs
    pub fn new(frames: impl IntoIterator<Item = (FrameId, Frame)>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frame for an id
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    /// Largest frame size (width, height)
    pub fn max_bounds(&self) -> (u16, u16) {
        self.frames.values().fold((0, 0), |(w, h), frame| {
            (w.max(frame.width), h.max(frame.height))
        })
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the book is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ============================================================================
// Sprite Builder Helpers
// ============================================================================

/// Parse a sprite definition using a color map
///
/// Format: each character in the pattern maps to a (char, Color) in the palette.
/// Special: ' ' (space) is always transparent.
///
/// Example:
/// ```ignore
/// let palette = [('H', '█', HAT_PURPLE), ('*', '✦', STAR_GOLD)];
/// let pattern = [
///     "  H  ",
///     " H*H ",
///     "HHHHH",
/// ];
/// ```
pub fn build_frame(pattern: &[&str], palette: &[(char, char, Color)]) -> Frame {
    let color_map: HashMap<char, (char, Color)> = palette
        .iter()
        .map(|&(key, ch, color)| (key, (ch, color)))
        .collect();

    let cells: Vec<Vec<ColoredCell>> = pattern
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| {
                    if c == ' ' {
                        ColoredCell::empty()
                    } else if let Some(&(ch, color)) = color_map.get(&c) {
                        ColoredCell::new(ch, color)
                    } else {
                        // Unknown char - show as-is in default color
                        ColoredCell::new(c, Color::Reset)
                    }
                })
                .collect()
        })
        .collect();

    Frame::new(cells)
}
