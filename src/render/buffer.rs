use crate::color::RGB128;
use crate::math::vector::Vec2i;

use enum_map::{enum_map, Enum, EnumMap};

use std::cell::UnsafeCell;

/// The per-pixel planes a render produces alongside the beauty image.
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layer {
    Color,
    Albedo,
    Normal,
}

/// The canonical render target: one `RGB128` grid per layer, `(0, 0)` at
/// the bottom-left. Writes go through `&self` so workers can share the
/// buffer; the tile scheduler guarantees no two workers ever own the same
/// position, which is what makes the unsynchronized cells sound.
pub struct RenderBuffer {
    size: Vec2i,
    layers: EnumMap<Layer, Vec<UnsafeCell<RGB128>>>,
}

// Positions are disjoint between concurrent writers; see above.
unsafe impl Sync for RenderBuffer {}

impl RenderBuffer {
    pub fn new(size: Vec2i) -> Self {
        assert!(size.x > 0 && size.y > 0, "degenerate buffer size");
        let count = (size.x * size.y) as usize;
        RenderBuffer {
            size,
            layers: enum_map! {
                _ => (0..count).map(|_| UnsafeCell::new(RGB128::black())).collect()
            },
        }
    }

    pub fn size(&self) -> Vec2i {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.size.x as f32 / self.size.y as f32
    }

    pub fn contains(&self, position: Vec2i) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.size.x && position.y < self.size.y
    }

    fn index(&self, position: Vec2i) -> usize {
        assert!(self.contains(position), "position {:?} out of bounds", position);
        (position.y * self.size.x + position.x) as usize
    }

    pub fn set(&self, layer: Layer, position: Vec2i, value: RGB128) {
        let index = self.index(position);
        unsafe {
            *self.layers[layer][index].get() = value;
        }
    }

    pub fn get(&self, layer: Layer, position: Vec2i) -> RGB128 {
        let index = self.index(position);
        unsafe { *self.layers[layer][index].get() }
    }

    /// Row-major copy of one layer, bottom row first.
    pub fn layer_pixels(&self, layer: Layer) -> Vec<RGB128> {
        self.layers[layer]
            .iter()
            .map(|cell| unsafe { *cell.get() })
            .collect()
    }
}
