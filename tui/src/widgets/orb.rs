//! Orb Widget
//!
//! The start/stop control: a glowing orb with a caption underneath.
//! Purple while idle, pink while a conversation runs, dimmed while the
//! connection is being set up.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::theme::{DIM_GRAY, MAGIC_PURPLE, ORB_PINK};

/// What the orb is showing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrbState {
    /// No session; pressing starts one
    Idle,
    /// Start in progress
    Connecting,
    /// Session running; pressing ends it
    Active,
}

impl OrbState {
    /// Caption under the orb
    pub fn caption(self) -> &'static str {
        match self {
            OrbState::Idle => "INITIATE MYSTICAL CONNECTION",
            OrbState::Connecting => "CONNECTING...",
            OrbState::Active => "CONVERSATION ACTIVE",
        }
    }

    fn glyph(self) -> [&'static str; 3] {
        match self {
            OrbState::Idle => [" ▄███▄ ", "███✦███", " ▀███▀ "],
            OrbState::Connecting => [" ▄░░░▄ ", "░░░✦░░░", " ▀░░░▀ "],
            OrbState::Active => [" ▄███▄ ", "██ ■ ██", " ▀███▀ "],
        }
    }

    fn style(self) -> Style {
        match self {
            OrbState::Idle => Style::default().fg(MAGIC_PURPLE),
            OrbState::Connecting => Style::default().fg(DIM_GRAY),
            OrbState::Active => Style::default().fg(ORB_PINK),
        }
    }
}

/// Orb control with caption
pub struct Orb {
    state: OrbState,
}

impl Orb {
    /// Orb in `state`
    pub fn new(state: OrbState) -> Self {
        Self { state }
    }

    /// Rows the orb needs (glyph, gap, caption)
    pub const HEIGHT: u16 = 5;
}

impl Widget for Orb {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < Self::HEIGHT || area.width < 8 {
            return;
        }

        let style = self.state.style();
        for (i, row) in self.state.glyph().iter().enumerate() {
            let width = u16::try_from(row.width()).unwrap_or(area.width);
            let x = area.x + area.width.saturating_sub(width) / 2;
            let y = area.y + u16::try_from(i).unwrap_or(0);
            buf.set_string(x, y, row, style);
        }

        let caption = self.state.caption();
        let width = u16::try_from(caption.width()).unwrap_or(area.width);
        let x = area.x + area.width.saturating_sub(width) / 2;
        buf.set_stringn(
            x,
            area.y + Self::HEIGHT - 1,
            caption,
            area.width as usize,
            style.add_modifier(Modifier::BOLD),
        );
    }
}
