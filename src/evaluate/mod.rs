pub mod albedo;
pub mod path_traced;
pub mod quality;

pub use albedo::AlbedoEvaluator;
pub use path_traced::PathTracedEvaluator;
pub use quality::TraceCostEvaluator;

use crate::color::RGB128;
use crate::distribution::ContinuousDistribution;
use crate::math::ray::Ray;
use crate::math::vector::Vec3f;
use crate::prepare::PreparedScene;
use crate::texture::DirectionalTexture;

use bumpalo::Bump;

use std::sync::Arc;

/// What a ray sees when it leaves the scene.
#[derive(Clone, Default)]
pub enum Ambient {
    /// Escaped rays carry nothing.
    #[default]
    None,
    Constant(RGB128),
    Directional(Arc<DirectionalTexture>),
}

impl Ambient {
    pub fn evaluate(&self, direction: Vec3f) -> RGB128 {
        match self {
            Ambient::None => RGB128::black(),
            Ambient::Constant(color) => *color,
            Ambient::Directional(texture) => texture.evaluate(direction),
        }
    }
}

/// Turns one camera ray into one radiance estimate. Implementations are
/// shared between workers and must stay reentrant: all per-sample state
/// lives in the distribution and arena the caller hands in.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        scene: &PreparedScene,
        ray: Ray,
        distribution: &mut dyn ContinuousDistribution,
        arena: &Bump,
    ) -> RGB128;
}
