use crate::color::RGB128;
use crate::distribution::ContinuousDistribution;
use crate::evaluate::{Ambient, Evaluator};
use crate::math::ray::Ray;
use crate::prepare::PreparedScene;
use crate::scene::query::TraceQuery;

use bumpalo::Bump;

/// Unidirectional path tracing with no explicit light sampling: walk the
/// path until it escapes, dies at a degenerate scatter, or runs out of
/// bounces. Dumb and unbiased; everything else in the renderer is judged
/// against it.
pub struct PathTracedEvaluator {
    bounce_limit: u32,
    ambient: Ambient,
}

impl PathTracedEvaluator {
    pub const DEFAULT_BOUNCE_LIMIT: u32 = 128;

    pub fn new(bounce_limit: u32, ambient: Ambient) -> Self {
        PathTracedEvaluator {
            bounce_limit,
            ambient,
        }
    }
}

impl Evaluator for PathTracedEvaluator {
    fn evaluate(
        &self,
        scene: &PreparedScene,
        ray: Ray,
        distribution: &mut dyn ContinuousDistribution,
        arena: &Bump,
    ) -> RGB128 {
        let mut energy = RGB128::black();
        let mut throughput = RGB128::white();
        let mut query = TraceQuery::new(ray);

        for _ in 0..self.bounce_limit {
            if !scene.trace(&mut query) {
                energy += throughput * self.ambient.evaluate(query.ray.dir);
                break;
            }

            let mut touch = scene.interact(&query);
            let material = touch.material;
            material.scatter(&mut touch, arena);

            if let Some(emissive) = material.as_emissive() {
                energy += throughput * emissive.emit(touch.point, touch.outgoing);
            }

            let bsdf = match touch.bsdf {
                Some(bsdf) => bsdf,
                // No scattering set: the surface is transparent to the
                // path, which continues straight through.
                None => {
                    query = query.spawn_trace(touch.point, query.ray.dir);
                    continue;
                }
            };

            let (f, incident, pdf, _) = bsdf.sample(touch.outgoing, distribution.next_2d());
            if pdf == 0. || f.is_black() {
                break;
            }

            let cos = touch.shading_normal.dot(incident).abs();
            throughput = throughput * f.scale((cos as f64 / pdf) as f32);

            query = query.spawn_trace(touch.point, incident);
        }

        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::AcceleratorProfile;
    use crate::distribution::continuous::stratified::StratifiedDistribution;
    use crate::material::{Emitter, Matte};
    use crate::math::vector::{Vec2i, Vec3};
    use crate::prepare::prepare;
    use crate::scene::Scene;

    use std::sync::Arc;

    fn render_many(
        scene: &PreparedScene,
        evaluator: &PathTracedEvaluator,
        ray: Ray,
        samples: u32,
    ) -> RGB128 {
        let mut distribution = StratifiedDistribution::new(Vec2i::new(16, 16), 4, true);
        let mut arena = Bump::new();
        let mut sum = RGB128::black();

        let rounds = samples.div_ceil(distribution.sample_count());
        for round in 0..rounds {
            distribution.begin_pixel(Vec2i::new(round as i32, 0));
            for i in 0..distribution.sample_count() {
                distribution.begin_sample(i);
                arena.reset();
                sum += evaluator.evaluate(scene, ray, &mut distribution, &arena);
            }
        }
        sum.scale(1. / (rounds * distribution.sample_count()) as f32)
    }

    #[test]
    fn escaped_rays_see_the_ambient() {
        let scene = prepare(&Arc::new(Scene::new()), &AcceleratorProfile::default()).unwrap();
        let evaluator = PathTracedEvaluator::new(4, Ambient::Constant(RGB128::new(1., 2., 3.)));

        let mut distribution = StratifiedDistribution::new(Vec2i::new(1, 1), 2, false);
        distribution.begin_pixel(Vec2i::new(0, 0));
        distribution.begin_sample(0);
        let arena = Bump::new();

        let ray = Ray::new(Vec3::zero(), Vec3::new(0., 0., 1.));
        let value = evaluator.evaluate(&scene, ray, &mut distribution, &arena);
        assert_eq!(value, RGB128::new(1., 2., 3.));
    }

    #[test]
    fn diffuse_sphere_under_white_sky_reflects_its_albedo() {
        let mut authored = Scene::new();
        let matte = authored.add_material(Arc::new(Matte::new(RGB128::splat(0.8))));
        authored.add_sphere(Vec3::zero(), 1., matte);
        let scene = prepare(&Arc::new(authored), &AcceleratorProfile::default()).unwrap();

        // Two bounces: hit, scatter, escape into the uniform sky.
        let evaluator = PathTracedEvaluator::new(2, Ambient::Constant(RGB128::white()));
        let ray = Ray::new(Vec3::new(0., 0., -3.), Vec3::new(0., 0., 1.));
        let value = render_many(&scene, &evaluator, ray, 2048);

        for channel in [value.r, value.g, value.b] {
            assert!((channel - 0.8).abs() < 0.05, "channel {}", channel);
        }
    }

    #[test]
    fn emitters_add_radiance_once() {
        let mut authored = Scene::new();
        let emitter = authored.add_material(Arc::new(Emitter::new(RGB128::splat(5.))));
        authored.add_triangle(
            [
                Vec3::new(-1., -1., 0.),
                Vec3::new(3., -1., 0.),
                Vec3::new(-1., 3., 0.),
            ],
            emitter,
        );
        let scene = prepare(&Arc::new(authored), &AcceleratorProfile::default()).unwrap();

        let evaluator = PathTracedEvaluator::new(4, Ambient::None);
        let mut distribution = StratifiedDistribution::new(Vec2i::new(1, 1), 2, false);
        distribution.begin_pixel(Vec2i::new(0, 0));
        distribution.begin_sample(0);
        let arena = Bump::new();

        let ray = Ray::new(Vec3::new(0., 0., 2.), Vec3::new(0., 0., -1.));
        let value = evaluator.evaluate(&scene, ray, &mut distribution, &arena);
        // The emitter does not scatter, so the path passes through and
        // escapes into a black ambient: exactly one emission pickup.
        assert_eq!(value, RGB128::splat(5.));
    }

    #[test]
    fn bounce_limit_terminates_mirror_boxes() {
        // Two facing mirrors; the path can never escape.
        let mut authored = Scene::new();
        let mirror = authored.add_material(Arc::new(crate::material::Mirror::new(
            RGB128::splat(0.9),
        )));
        authored.add_triangle(
            [
                Vec3::new(-10., -10., 0.),
                Vec3::new(10., -10., 0.),
                Vec3::new(0., 10., 0.),
            ],
            mirror,
        );
        authored.add_triangle(
            [
                Vec3::new(-10., -10., 5.),
                Vec3::new(10., -10., 5.),
                Vec3::new(0., 10., 5.),
            ],
            mirror,
        );
        let scene = prepare(&Arc::new(authored), &AcceleratorProfile::default()).unwrap();

        let evaluator = PathTracedEvaluator::new(16, Ambient::Constant(RGB128::white()));
        let mut distribution = StratifiedDistribution::new(Vec2i::new(1, 1), 2, false);
        distribution.begin_pixel(Vec2i::new(0, 0));
        distribution.begin_sample(0);
        let arena = Bump::new();

        let ray = Ray::new(Vec3::new(0., 0., 2.), Vec3::new(0., 0., 1.));
        let value = evaluator.evaluate(&scene, ray, &mut distribution, &arena);
        // Forced termination returns whatever accumulated: nothing.
        assert!(value.is_black());
        assert!(value.is_finite());
    }
}
