pub mod bvh;
pub mod builder;
pub mod linear;
pub mod quad_bvh;

pub use bvh::Bvh;
pub use linear::LinearAccelerator;
pub use quad_bvh::QuadBvh;

use crate::geometry::GeometryCounts;
use crate::math::bbox::BBox3;
use crate::math::matrix::Mat4;
use crate::math::ray::Ray;
use crate::prepare::pack::PreparedPack;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::EntityToken;

/// A primitive handed to an accelerator builder: its token and the bound
/// it must be found inside.
pub type TokenBound = (EntityToken, BBox3);

/// Spatial index over one pack's primitives. Implementations hold no
/// mutable state, so any number of workers may query them concurrently;
/// the narrow phase is delegated back to the pack, which also descends
/// into instances.
///
/// A trace may only ever tighten `query.distance`; reporting a hit beyond
/// the bound the query arrived with is a contract violation.
pub trait Accelerator: Send + Sync {
    /// Updates the query with the nearest hit, if any is closer than the
    /// query's current distance.
    fn trace(&self, pack: &PreparedPack, query: &mut TraceQuery);

    /// True as soon as anything lies closer than `query.travel`.
    fn occlude(&self, pack: &PreparedPack, query: &mut OccludeQuery) -> bool;

    /// Number of boxes and primitives tested to trace `ray`; `distance`
    /// shrinks like a trace bound. Drives the traversal-cost debug view.
    fn trace_cost(&self, pack: &PreparedPack, ray: Ray, distance: &mut f32) -> u32;

    fn bounds(&self) -> BBox3;

    /// Conservative bound of the contents under an affine transform; used
    /// to box instance nodes in parent packs.
    fn transformed_bounds(&self, transform: &Mat4) -> BBox3 {
        transform.transform_bound(self.bounds())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AcceleratorKind {
    Linear,
    Bvh,
    QuadBvh,
}

/// How packs choose their accelerator.
#[derive(Copy, Clone, Debug)]
pub struct AcceleratorProfile {
    /// Explicit structure; `None` selects from the primitive count.
    pub kind: Option<AcceleratorKind>,
    /// Permit the linear scan for small packs even when they contain
    /// instances. Off by default: an instance hides arbitrary cost behind
    /// one box, which a scan cannot skip.
    pub linear_for_instances: bool,
}

impl Default for AcceleratorProfile {
    fn default() -> Self {
        AcceleratorProfile {
            kind: None,
            linear_for_instances: false,
        }
    }
}

impl AcceleratorProfile {
    const QUAD_THRESHOLD: usize = 512;
    const BVH_THRESHOLD: usize = 32;

    pub fn select(&self, counts: GeometryCounts) -> AcceleratorKind {
        if let Some(kind) = self.kind {
            return kind;
        }

        let total = counts.total();
        if total >= Self::QUAD_THRESHOLD {
            AcceleratorKind::QuadBvh
        } else if total >= Self::BVH_THRESHOLD {
            AcceleratorKind::Bvh
        } else if counts.instances > 0 && !self.linear_for_instances {
            AcceleratorKind::Bvh
        } else {
            AcceleratorKind::Linear
        }
    }
}

pub fn build(kind: AcceleratorKind, pairs: Vec<TokenBound>) -> Box<dyn Accelerator> {
    match kind {
        AcceleratorKind::Linear => Box::new(LinearAccelerator::new(pairs)),
        AcceleratorKind::Bvh => Box::new(Bvh::new(pairs)),
        AcceleratorKind::QuadBvh => Box::new(QuadBvh::new(pairs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(triangles: usize, instances: usize) -> GeometryCounts {
        GeometryCounts {
            triangles,
            spheres: 0,
            instances,
        }
    }

    #[test]
    fn selection_follows_primitive_count() {
        let profile = AcceleratorProfile::default();
        assert_eq!(profile.select(counts(4, 0)), AcceleratorKind::Linear);
        assert_eq!(profile.select(counts(32, 0)), AcceleratorKind::Bvh);
        assert_eq!(profile.select(counts(511, 0)), AcceleratorKind::Bvh);
        assert_eq!(profile.select(counts(512, 0)), AcceleratorKind::QuadBvh);
    }

    #[test]
    fn instances_veto_the_linear_scan() {
        let profile = AcceleratorProfile::default();
        assert_eq!(profile.select(counts(2, 1)), AcceleratorKind::Bvh);

        let permissive = AcceleratorProfile {
            linear_for_instances: true,
            ..AcceleratorProfile::default()
        };
        assert_eq!(permissive.select(counts(2, 1)), AcceleratorKind::Linear);
    }

    #[test]
    fn explicit_kind_wins() {
        let profile = AcceleratorProfile {
            kind: Some(AcceleratorKind::Linear),
            linear_for_instances: false,
        };
        assert_eq!(profile.select(counts(100_000, 5)), AcceleratorKind::Linear);
    }

    mod agreement {
        use super::super::*;
        use crate::color::RGB128;
        use crate::material::Matte;
        use crate::math::random::RandGen;
        use crate::math::vector::{Vec3, Vec3f};
        use crate::prepare::{prepare, PreparedScene};
        use crate::scene::query::{OccludeQuery, TraceQuery};
        use crate::scene::Scene;

        use std::sync::Arc;

        fn random_point(rng: &mut RandGen, extent: f32) -> Vec3f {
            Vec3 {
                x: (rng.uniform_f64() as f32 - 0.5) * extent,
                y: (rng.uniform_f64() as f32 - 0.5) * extent,
                z: (rng.uniform_f64() as f32 - 0.5) * extent,
            }
        }

        fn random_soup(triangles: usize) -> Arc<Scene> {
            let mut rng = RandGen::new(0x5eed);
            let mut scene = Scene::new();
            let matte = scene.add_material(Arc::new(Matte::new(RGB128::splat(0.5))));
            for _ in 0..triangles {
                let anchor = random_point(&mut rng, 20.);
                scene.add_triangle(
                    [
                        anchor,
                        anchor + random_point(&mut rng, 1.),
                        anchor + random_point(&mut rng, 1.),
                    ],
                    matte,
                );
            }
            Arc::new(scene)
        }

        fn with_kind(scene: &Arc<Scene>, kind: AcceleratorKind) -> PreparedScene {
            let profile = AcceleratorProfile {
                kind: Some(kind),
                linear_for_instances: false,
            };
            prepare(scene, &profile).unwrap()
        }

        // Every hierarchy must report exactly what the exhaustive scan
        // reports, ray for ray.
        #[test]
        fn hierarchies_agree_with_the_linear_reference() {
            let soup = random_soup(10_000);
            let linear = with_kind(&soup, AcceleratorKind::Linear);
            let bvh = with_kind(&soup, AcceleratorKind::Bvh);
            let quad = with_kind(&soup, AcceleratorKind::QuadBvh);

            let mut rng = RandGen::new(0xca5e);
            let mut hits = 0usize;
            for _ in 0..512 {
                let ray = crate::math::ray::Ray::new(
                    random_point(&mut rng, 30.),
                    random_point(&mut rng, 2.) + Vec3::new(0., 0., 1e-3),
                );

                let mut reference = TraceQuery::new(ray);
                linear.trace(&mut reference);

                for candidate in [&bvh, &quad] {
                    let mut query = TraceQuery::new(ray);
                    candidate.trace(&mut query);

                    assert_eq!(query.hit(), reference.hit());
                    if reference.hit() {
                        assert_eq!(query.token, reference.token);
                        assert!(
                            (query.distance - reference.distance).abs()
                                <= reference.distance.abs() * 1e-6 + 1e-6,
                            "{} vs {}",
                            query.distance,
                            reference.distance
                        );
                    }
                }

                if reference.hit() {
                    hits += 1;

                    // Occlusion agrees with trace on both sides of the hit.
                    for scene in [&linear, &bvh, &quad] {
                        let mut beyond =
                            OccludeQuery::new(ray, reference.distance * 1.001 + 1e-3);
                        assert!(scene.occlude(&mut beyond));
                        let mut short = OccludeQuery::new(ray, reference.distance * 0.5);
                        assert!(!scene.occlude(&mut short));
                    }
                }
            }

            // The soup is dense enough that a healthy share of rays hit;
            // an empty tally would make the whole comparison vacuous.
            assert!(hits > 50, "only {} rays hit", hits);
        }

        #[test]
        fn trace_cost_counts_work() {
            let soup = random_soup(512);
            let quad = with_kind(&soup, AcceleratorKind::QuadBvh);
            let linear = with_kind(&soup, AcceleratorKind::Linear);

            let ray = crate::math::ray::Ray::new(Vec3::new(0., 0., -40.), Vec3::new(0., 0., 1.));
            let mut distance = f32::INFINITY;
            let quad_cost = quad.trace_cost(ray, &mut distance);

            let mut distance = f32::INFINITY;
            let linear_cost = linear.trace_cost(ray, &mut distance);

            assert!(quad_cost > 0);
            // The scan tests every box; the hierarchy skips most of them.
            assert!(quad_cost < linear_cost, "{} vs {}", quad_cost, linear_cost);
        }
    }
}
