pub mod directional;

pub use directional::DirectionalTexture;

use crate::color::RGB128;
use crate::math::vector::Vec2f;

/// A plain texel grid. Reads are nearest-sample; the renderer's textures
/// are prepared data, not filtered assets.
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    texels: Vec<RGB128>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        Grid {
            width,
            height,
            texels: vec![RGB128::black(); width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> RGB128) -> Self {
        let mut grid = Grid::new(width, height);
        for y in 0..height {
            for x in 0..width {
                grid.texels[y * width + x] = f(x, y);
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> RGB128 {
        self.texels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: RGB128) {
        self.texels[y * self.width + x] = value;
    }

    /// Nearest texel under normalized coordinates in `[0, 1)`.
    pub fn sample(&self, uv: Vec2f) -> RGB128 {
        let x = ((uv.x * self.width as f32) as usize).min(self.width - 1);
        let y = ((uv.y * self.height as f32) as usize).min(self.height - 1);
        self.get(x, y)
    }
}
