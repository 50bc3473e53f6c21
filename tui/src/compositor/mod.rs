//! Layered Compositor
//!
//! Manages z-ordered layers for rendering. Each screen region (header,
//! stage, orb, banners, transcript, footer) draws into its own layer buffer;
//! the compositor stacks the visible ones into the final output buffer.
//!
//! Blank cells are transparent, so Magic Man's poof smoke can drift over
//! the stage background without erasing it.

mod layer;

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

pub use layer::Layer;

/// Unique identifier for a layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(u32);

/// The compositor manages all layers and composites them together
pub struct Compositor {
    /// All layers by ID
    layers: HashMap<LayerId, Layer>,
    /// Layers sorted by z-index for rendering
    render_order: Vec<LayerId>,
    /// Next layer ID to assign
    next_id: u32,
    /// Output buffer (composited result)
    output: Buffer,
    /// Total area
    area: Rect,
}

impl Compositor {
    /// Create a new compositor for the given area
    pub fn new(area: Rect) -> Self {
        Self {
            layers: HashMap::new(),
            render_order: Vec::new(),
            next_id: 0,
            output: Buffer::empty(area),
            area,
        }
    }

    /// Create a new layer and return its ID
    pub fn create_layer(&mut self, bounds: Rect, z_index: i32) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;

        self.layers.insert(id, Layer::new(id, bounds, z_index));
        self.update_render_order();

        id
    }

    /// Get mutable access to a layer's buffer, cleared for a fresh frame
    pub fn layer_buffer_mut(&mut self, id: LayerId) -> Option<&mut Buffer> {
        self.layers.get_mut(&id).map(|layer| {
            layer.clear();
            &mut layer.buffer
        })
    }

    /// Set a layer's z-index
    pub fn set_z_index(&mut self, id: LayerId, z_index: i32) {
        if let Some(layer) = self.layers.get_mut(&id) {
            if layer.z_index != z_index {
                layer.z_index = z_index;
                self.update_render_order();
            }
        }
    }

    /// Move and resize a layer
    pub fn set_bounds(&mut self, id: LayerId, bounds: Rect) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.set_bounds(bounds);
        }
    }

    /// Screen bounds of a layer
    pub fn bounds(&self, id: LayerId) -> Option<Rect> {
        self.layers.get(&id).map(|layer| layer.bounds)
    }

    /// Set layer visibility
    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.visible = visible;
        }
    }

    /// Whether a layer is composited
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.layers.get(&id).is_some_and(|layer| layer.visible)
    }

    /// Resize the entire compositor
    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.output = Buffer::empty(area);
    }

    /// Total area
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Composite all visible layers into the output buffer
    pub fn composite(&mut self) -> &Buffer {
        self.output.reset();

        // Back to front
        for id in &self.render_order {
            if let Some(layer) = self.layers.get(id) {
                if layer.visible {
                    Self::blit_layer(&mut self.output, self.area, layer);
                }
            }
        }

        &self.output
    }

    /// Blit a layer onto the output buffer; blank cells are transparent
    fn blit_layer(output: &mut Buffer, area: Rect, layer: &Layer) {
        let lb = layer.bounds;

        for ly in 0..lb.height {
            for lx in 0..lb.width {
                let dst_x = lb.x.saturating_add(lx);
                let dst_y = lb.y.saturating_add(ly);
                if dst_x >= area.x + area.width || dst_y >= area.y + area.height {
                    continue;
                }

                let src_idx = layer.buffer.index_of(lx, ly);
                let Some(src_cell) = layer.buffer.content.get(src_idx) else {
                    continue;
                };

                if src_cell.symbol() != " " || src_cell.bg != Color::Reset {
                    output[(dst_x, dst_y)] = src_cell.clone();
                }
            }
        }
    }

    /// Update render order based on z-indices
    fn update_render_order(&mut self) {
        self.render_order = self.layers.keys().copied().collect();
        let layers = &self.layers;
        self.render_order.sort_by_key(|id| {
            let z = layers.get(id).map_or(0, |layer| layer.z_index);
            (z, id.0)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Style;

    #[test]
    fn test_higher_z_index_wins() {
        let mut compositor = Compositor::new(Rect::new(0, 0, 4, 1));
        let back = compositor.create_layer(Rect::new(0, 0, 4, 1), 0);
        let front = compositor.create_layer(Rect::new(0, 0, 4, 1), 10);

        if let Some(buf) = compositor.layer_buffer_mut(back) {
            buf.set_string(0, 0, "bbbb", Style::default());
        }
        if let Some(buf) = compositor.layer_buffer_mut(front) {
            buf.set_string(0, 0, "ff", Style::default());
        }

        let out = compositor.composite();
        assert_eq!(out[(0, 0)].symbol(), "f");
        assert_eq!(out[(1, 0)].symbol(), "f");
        assert_eq!(out[(2, 0)].symbol(), "b");
    }

    #[test]
    fn test_set_z_index_reorders() {
        let mut compositor = Compositor::new(Rect::new(0, 0, 1, 1));
        let a = compositor.create_layer(Rect::new(0, 0, 1, 1), 0);
        let b = compositor.create_layer(Rect::new(0, 0, 1, 1), 5);
        if let Some(buf) = compositor.layer_buffer_mut(a) {
            buf.set_string(0, 0, "a", Style::default());
        }
        if let Some(buf) = compositor.layer_buffer_mut(b) {
            buf.set_string(0, 0, "b", Style::default());
        }

        compositor.set_z_index(a, 9);
        assert_eq!(compositor.composite()[(0, 0)].symbol(), "a");
    }

    #[test]
    fn test_hidden_layers_are_skipped() {
        let mut compositor = Compositor::new(Rect::new(0, 0, 2, 1));
        let layer = compositor.create_layer(Rect::new(0, 0, 2, 1), 0);
        if let Some(buf) = compositor.layer_buffer_mut(layer) {
            buf.set_string(0, 0, "xx", Style::default());
        }

        compositor.set_visible(layer, false);
        assert!(!compositor.is_visible(layer));
        assert_eq!(compositor.composite()[(0, 0)].symbol(), " ");
    }

    #[test]
    fn test_layers_are_positioned_and_clipped() {
        let mut compositor = Compositor::new(Rect::new(0, 0, 4, 2));
        let layer = compositor.create_layer(Rect::new(0, 0, 2, 1), 0);
        compositor.set_bounds(layer, Rect::new(3, 1, 2, 1));
        if let Some(buf) = compositor.layer_buffer_mut(layer) {
            buf.set_string(0, 0, "xy", Style::default());
        }

        let out = compositor.composite();
        assert_eq!(out[(3, 1)].symbol(), "x");
        assert_eq!(compositor.bounds(layer), Some(Rect::new(3, 1, 2, 1)));
    }
}
