use crate::color::RGB128;
use crate::distribution::ContinuousDistribution;
use crate::evaluate::Evaluator;
use crate::math::ray::Ray;
use crate::prepare::PreparedScene;

use bumpalo::Bump;

use std::sync::atomic::{AtomicU64, Ordering};

/// Traversal-cost debug view: how hard did the accelerator work for each
/// pixel? Channels carry `(cost here, cost so far, samples so far)`; the
/// running totals are shared across every worker rendering the frame.
#[derive(Default)]
pub struct TraceCostEvaluator {
    total_cost: AtomicU64,
    total_samples: AtomicU64,
}

impl TraceCostEvaluator {
    pub fn new() -> Self {
        TraceCostEvaluator::default()
    }

    pub fn total_cost(&self) -> u64 {
        self.total_cost.load(Ordering::Relaxed)
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples.load(Ordering::Relaxed)
    }
}

impl Evaluator for TraceCostEvaluator {
    fn evaluate(
        &self,
        scene: &PreparedScene,
        ray: Ray,
        _distribution: &mut dyn ContinuousDistribution,
        _arena: &Bump,
    ) -> RGB128 {
        let mut distance = f32::INFINITY;
        let cost = scene.trace_cost(ray, &mut distance) as u64;

        let total = self.total_cost.fetch_add(cost, Ordering::Relaxed) + cost;
        let samples = self.total_samples.fetch_add(1, Ordering::Relaxed) + 1;

        RGB128::new(cost as f32, total as f32, samples as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::AcceleratorProfile;
    use crate::color::RGB128;
    use crate::distribution::continuous::stratified::StratifiedDistribution;
    use crate::material::Matte;
    use crate::math::vector::{Vec2i, Vec3};
    use crate::prepare::prepare;
    use crate::scene::Scene;

    use std::sync::Arc;

    #[test]
    fn counters_accumulate_across_evaluations() {
        let mut authored = Scene::new();
        let matte = authored.add_material(Arc::new(Matte::new(RGB128::splat(0.5))));
        for i in 0..64 {
            let x = (i % 8) as f32 * 2.;
            let y = (i / 8) as f32 * 2.;
            authored.add_sphere(Vec3::new(x, y, 0.), 0.5, matte);
        }
        let scene = prepare(&Arc::new(authored), &AcceleratorProfile::default()).unwrap();

        let evaluator = TraceCostEvaluator::new();
        let mut distribution = StratifiedDistribution::new(Vec2i::new(1, 1), 1, false);
        let arena = Bump::new();

        let ray = Ray::new(Vec3::new(4., 4., -10.), Vec3::new(0., 0., 1.));
        let first = evaluator.evaluate(&scene, ray, &mut distribution, &arena);
        let second = evaluator.evaluate(&scene, ray, &mut distribution, &arena);

        assert!(first.r > 0., "tracing tested something");
        assert_eq!(first.r, second.r, "same ray, same cost");
        assert_eq!(second.g, first.g + second.r);
        assert_eq!(first.b, 1.);
        assert_eq!(second.b, 2.);
        assert_eq!(evaluator.total_samples(), 2);
    }
}
