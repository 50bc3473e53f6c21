//! Avatar System - Magic Man on Stage
//!
//! The character is drawn from the core [`CharacterAnimator`]: the session
//! decides whether he should be there and whether he is talking, the
//! animator decides which picture that means, and this module maps the
//! picture to pixel art.

mod magic_man;
mod sprites;

use std::time::Duration;

use ratatui::buffer::Buffer;

use magic_core::config::AnimationConfig;
use magic_core::{CharacterAnimator, FrameId, Phase, PoofDirection};

pub use magic_man::{frame_for, sprite_book, ALL_FRAMES};
pub use sprites::{build_frame, ColoredCell, Frame, SpriteBook};

/// The animated Magic Man character
pub struct Avatar {
    /// Presentation state machine
    animator: CharacterAnimator,
    /// Pixel art for every frame id
    book: SpriteBook,
}

impl Avatar {
    /// Create a hidden avatar
    pub fn new(timing: AnimationConfig) -> Self {
        let mut animator = CharacterAnimator::new(timing);
        animator.set_on_poof_complete(Box::new(|direction| match direction {
            PoofDirection::In => tracing::debug!("Magic Man poofed in"),
            PoofDirection::Out => tracing::debug!("Magic Man poofed out"),
        }));

        Self {
            animator,
            book: sprite_book(),
        }
    }

    /// Feed the session's presentation inputs
    pub fn sync(&mut self, visible: bool, speaking: bool) {
        self.animator.set_visible(visible);
        self.animator.set_speaking(speaking);
    }

    /// Update animation (call every frame); returns whether the frame changed
    pub fn update(&mut self, delta: Duration) -> bool {
        self.animator.update(delta)
    }

    /// Hide at once and drop running animations (teardown)
    pub fn reset(&mut self) {
        self.animator.reset();
    }

    /// Render the current frame centered in the buffer
    pub fn render(&self, buf: &mut Buffer) {
        if let Some(frame) = self.current_frame().and_then(|id| self.book.get(id)) {
            frame.draw_centered(buf);
        }
    }

    /// Frame being shown, if any
    pub fn current_frame(&self) -> Option<FrameId> {
        self.animator.current_frame()
    }

    /// Animator phase
    pub fn phase(&self) -> Phase {
        self.animator.phase()
    }

    /// Whether anything is drawn, poof smoke included
    pub fn is_shown(&self) -> bool {
        self.current_frame().is_some()
    }

    /// Sprite size bounds
    pub fn bounds(&self) -> (u16, u16) {
        self.book.max_bounds()
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}
