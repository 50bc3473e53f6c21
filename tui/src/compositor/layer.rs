//! Layer - A single compositable layer

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use super::LayerId;

/// A single layer in the compositor
pub struct Layer {
    /// Unique identifier
    pub id: LayerId,
    /// Z-order (higher = in front)
    pub z_index: i32,
    /// Position and size on screen
    pub bounds: Rect,
    /// Whether the layer is composited
    pub visible: bool,
    /// The layer's render buffer, origin at (0, 0)
    pub buffer: Buffer,
}

impl Layer {
    /// Create a new layer
    pub fn new(id: LayerId, bounds: Rect, z_index: i32) -> Self {
        Self {
            id,
            z_index,
            bounds,
            visible: true,
            buffer: Buffer::empty(Self::local_area(bounds)),
        }
    }

    /// Move and resize; the buffer is recreated only when the size changes
    pub fn set_bounds(&mut self, bounds: Rect) {
        let resized = bounds.width != self.bounds.width || bounds.height != self.bounds.height;
        self.bounds = bounds;
        if resized {
            self.buffer = Buffer::empty(Self::local_area(bounds));
        }
    }

    /// Blank the buffer for the next frame
    pub fn clear(&mut self) {
        self.buffer.reset();
    }

    fn local_area(bounds: Rect) -> Rect {
        Rect::new(0, 0, bounds.width, bounds.height)
    }
}
