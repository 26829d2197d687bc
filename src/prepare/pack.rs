use crate::accelerator::Accelerator;
use crate::geometry::{GeometryCounts, PreparedSphere, PreparedTriangle};
use crate::math::ray::Ray;
use crate::prepare::instance::PreparedInstance;
use crate::prepare::swatch::PreparedSwatch;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::{EntityToken, TokenHierarchy, TokenKind};

use std::sync::Arc;

/// One scene frozen for querying: ordered primitive arrays, the spatial
/// index over them, and the material table. Packs are immutable after
/// preparation and shared by every instance that references the same
/// source scene.
pub struct PreparedPack {
    triangles: Vec<PreparedTriangle>,
    spheres: Vec<PreparedSphere>,
    instances: Vec<PreparedInstance>,
    accelerator: Box<dyn Accelerator>,
    swatch: Arc<PreparedSwatch>,
    counts: GeometryCounts,
    /// Longest instance chain below this pack, this pack included.
    depth: usize,
}

impl PreparedPack {
    pub(crate) fn assemble(
        triangles: Vec<PreparedTriangle>,
        spheres: Vec<PreparedSphere>,
        instances: Vec<PreparedInstance>,
        accelerator: Box<dyn Accelerator>,
        swatch: Arc<PreparedSwatch>,
    ) -> Self {
        let counts = GeometryCounts {
            triangles: triangles.len(),
            spheres: spheres.len(),
            instances: instances.len(),
        };
        let depth = 1 + instances
            .iter()
            .map(|i| i.pack().depth)
            .max()
            .unwrap_or(0);

        PreparedPack {
            triangles,
            spheres,
            instances,
            accelerator,
            swatch,
            counts,
            depth,
        }
    }

    pub fn counts(&self) -> GeometryCounts {
        self.counts
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn swatch(&self) -> &Arc<PreparedSwatch> {
        &self.swatch
    }

    pub fn accelerator(&self) -> &dyn Accelerator {
        &*self.accelerator
    }

    pub fn triangles(&self) -> &[PreparedTriangle] {
        &self.triangles
    }

    pub fn spheres(&self) -> &[PreparedSphere] {
        &self.spheres
    }

    pub fn instances(&self) -> &[PreparedInstance] {
        &self.instances
    }

    pub fn trace(&self, query: &mut TraceQuery) {
        self.accelerator.trace(self, query);
    }

    pub fn occlude(&self, query: &mut OccludeQuery) -> bool {
        self.accelerator.occlude(self, query)
    }

    pub fn trace_cost(&self, ray: Ray, distance: &mut f32) -> u32 {
        self.accelerator.trace_cost(self, ray, distance)
    }

    /// Narrow phase for one token, called back from the accelerators.
    /// The `ignore` comparison is hierarchical: only the exact entity the
    /// query spawned from is skipped, not every use of its geometry.
    pub(crate) fn trace_token(&self, token: EntityToken, query: &mut TraceQuery) {
        match token.kind() {
            TokenKind::Triangle => {
                if query.ignore.matches(&query.current, token) {
                    return;
                }
                let triangle = &self.triangles[token.index()];
                let (t, uv) = triangle.intersect(query.ray);
                if t < query.distance {
                    query.distance = t;
                    query.uv = uv;
                    query.token = TokenHierarchy::extended(&query.current, token);
                }
            }
            TokenKind::Sphere => {
                // A sphere shadow-raying itself picks its far side instead
                // of being skipped outright.
                let find_far = query.ignore.matches(&query.current, token);
                let sphere = &self.spheres[token.index()];
                let t = sphere.intersect(query.ray, find_far);
                if t < query.distance {
                    query.distance = t;
                    query.uv = crate::math::vector::Vec2f::zero();
                    query.token = TokenHierarchy::extended(&query.current, token);
                }
            }
            TokenKind::Instance => self.instances[token.index()].trace(token, query),
            TokenKind::Node | TokenKind::Empty => {}
        }
    }

    pub(crate) fn occlude_token(&self, token: EntityToken, query: &mut OccludeQuery) -> bool {
        match token.kind() {
            TokenKind::Triangle => {
                if query.ignore.matches(&query.current, token) {
                    return false;
                }
                self.triangles[token.index()].intersect_occlude(query.ray, query.travel)
            }
            TokenKind::Sphere => {
                let find_far = query.ignore.matches(&query.current, token);
                let sphere = &self.spheres[token.index()];
                sphere.intersect(query.ray, find_far) < query.travel
            }
            TokenKind::Instance => self.instances[token.index()].occlude(token, query),
            TokenKind::Node | TokenKind::Empty => false,
        }
    }

    pub(crate) fn cost_token(&self, token: EntityToken, ray: Ray, distance: &mut f32) -> u32 {
        match token.kind() {
            TokenKind::Triangle => {
                let (t, _) = self.triangles[token.index()].intersect(ray);
                if t < *distance {
                    *distance = t;
                }
                1
            }
            TokenKind::Sphere => {
                let t = self.spheres[token.index()].intersect(ray, false);
                if t < *distance {
                    *distance = t;
                }
                1
            }
            TokenKind::Instance => self.instances[token.index()].trace_cost(ray, distance),
            TokenKind::Node | TokenKind::Empty => 0,
        }
    }
}
