use crate::color::RGB128;
use crate::distribution::ContinuousDistribution;
use crate::evaluate::{Ambient, Evaluator};
use crate::math::ray::Ray;
use crate::prepare::PreparedScene;
use crate::scene::query::TraceQuery;

use bumpalo::Bump;

/// First-hit surface color, no transport at all. Fills the auxiliary
/// albedo layer and doubles as a fast scene-sanity view.
pub struct AlbedoEvaluator {
    ambient: Ambient,
}

impl AlbedoEvaluator {
    pub fn new(ambient: Ambient) -> Self {
        AlbedoEvaluator { ambient }
    }
}

impl Evaluator for AlbedoEvaluator {
    fn evaluate(
        &self,
        scene: &PreparedScene,
        ray: Ray,
        _distribution: &mut dyn ContinuousDistribution,
        _arena: &Bump,
    ) -> RGB128 {
        let mut query = TraceQuery::new(ray);
        if !scene.trace(&mut query) {
            return self.ambient.evaluate(query.ray.dir);
        }

        let touch = scene.interact(&query);
        touch.material.albedo()
    }
}
