//! Transcript Widget
//!
//! A borderless, scrollable view of the conversation. Scrolling counts
//! lines up from the newest entry, so new lines stay in view unless the
//! visitor has scrolled back.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;

use crate::display::DisplayLine;

/// Scroll state for the transcript
#[derive(Debug, Default)]
pub struct TranscriptState {
    /// Scroll offset (lines from bottom, 0 = latest)
    pub scroll_offset: usize,
    /// Total wrapped lines at last render
    pub total_lines: usize,
}

impl TranscriptState {
    /// Scroll towards older lines
    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines).min(max_scroll);
    }

    /// Scroll towards newer lines
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Jump to the newest line
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}

/// The conversation transcript
pub struct TranscriptView<'a> {
    lines: &'a [DisplayLine],
    agent_style: Style,
    user_style: Style,
}

impl<'a> TranscriptView<'a> {
    /// View over `lines`, oldest first
    pub fn new(lines: &'a [DisplayLine]) -> Self {
        Self {
            lines,
            agent_style: Style::default(),
            user_style: Style::default(),
        }
    }

    /// Style for Magic Man's lines
    pub fn agent_style(mut self, style: Style) -> Self {
        self.agent_style = style;
        self
    }

    /// Style for the visitor's lines
    pub fn user_style(mut self, style: Style) -> Self {
        self.user_style = style;
        self
    }

    fn wrapped(&self, width: usize) -> Vec<(String, Style)> {
        let mut out = Vec::new();
        for line in self.lines {
            let style = if line.is_agent() {
                self.agent_style
            } else {
                self.user_style
            };
            for row in wrap(&line.rendered(), width) {
                out.push((row.into_owned(), style));
            }
        }
        out
    }
}

impl StatefulWidget for TranscriptView<'_> {
    type State = TranscriptState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let width = area.width as usize;
        let height = area.height as usize;
        if width < 4 || height == 0 {
            return;
        }

        let rows = self.wrapped(width);
        state.total_lines = rows.len();

        let max_scroll = rows.len().saturating_sub(height);
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        let visible_end = rows.len() - state.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);
        let has_content_above = visible_start > 0;

        for (i, (row, style)) in rows[visible_start..visible_end].iter().enumerate() {
            let y = area.y + u16::try_from(i).unwrap_or(u16::MAX);
            // Fade the top line when older lines are hidden
            let style = if has_content_above && i == 0 {
                Style::default().fg(Color::Rgb(90, 90, 90))
            } else {
                *style
            };
            buf.set_stringn(area.x, y, row, width, style);
        }
    }
}
