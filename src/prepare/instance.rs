use crate::math::bbox::BBox3;
use crate::math::matrix::Mat4;
use crate::math::ray::Ray;
use crate::prepare::pack::PreparedPack;
use crate::prepare::power::PowerDistribution;
use crate::prepare::swatch::PreparedSwatch;
use crate::prepare::PreparationError;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::EntityToken;

use std::sync::Arc;

// Rows of a uniform transform may still disagree by float noise.
const SCALE_TOLERANCE: f32 = 1e-4;

/// A placement of a shared pack under an affine, uniformly scaling
/// transform. Queries are rewritten into the pack's local space on entry
/// and restored on exit, so the pack itself never knows where it sits.
pub struct PreparedInstance {
    pack: Arc<PreparedPack>,
    swatch: Arc<PreparedSwatch>,

    /// Parent space to local space.
    forward: Mat4,
    /// Local space to parent space (the authored placement).
    inverse: Mat4,
    /// Reciprocal pair of uniform scales; `forward_scale` shrinks parent
    /// distances into local ones.
    forward_scale: f32,
    inverse_scale: f32,

    power: Option<Arc<PowerDistribution>>,
}

impl PreparedInstance {
    pub fn new(
        pack: Arc<PreparedPack>,
        swatch: Arc<PreparedSwatch>,
        transform: Mat4,
        power: Option<Arc<PowerDistribution>>,
    ) -> Result<Self, PreparationError> {
        let scales = transform.row_scales();
        let inverse_scale = scales.x;
        if (scales.y - inverse_scale).abs() > SCALE_TOLERANCE * inverse_scale
            || (scales.z - inverse_scale).abs() > SCALE_TOLERANCE * inverse_scale
            || inverse_scale <= 0.
        {
            return Err(PreparationError::NonUniformScale {
                scales: (scales.x, scales.y, scales.z),
            });
        }

        let forward = transform
            .inverse()
            .ok_or(PreparationError::SingularTransform)?;

        Ok(PreparedInstance {
            pack,
            swatch,
            forward,
            inverse: transform,
            forward_scale: 1. / inverse_scale,
            inverse_scale,
            power,
        })
    }

    pub fn pack(&self) -> &Arc<PreparedPack> {
        &self.pack
    }

    pub fn swatch(&self) -> &Arc<PreparedSwatch> {
        &self.swatch
    }

    pub fn forward(&self) -> Mat4 {
        self.forward
    }

    pub fn inverse(&self) -> Mat4 {
        self.inverse
    }

    pub fn inverse_scale(&self) -> f32 {
        self.inverse_scale
    }

    pub fn power_distribution(&self) -> Option<&PowerDistribution> {
        self.power.as_deref()
    }

    /// Radiant power of the contents as seen from the parent: the local
    /// total grows with the square of the placement scale.
    pub fn power(&self) -> f64 {
        self.power
            .as_ref()
            .map(|p| p.total() * (self.inverse_scale as f64) * (self.inverse_scale as f64))
            .unwrap_or(0.)
    }

    /// Bound of the contents in parent space.
    pub fn bounds(&self) -> BBox3 {
        self.pack.accelerator().transformed_bounds(&self.inverse)
    }

    fn localize(&self, ray: Ray) -> Ray {
        Ray {
            org: self.forward.mul_point(ray.org),
            dir: self
                .forward
                .mul_vector(ray.dir)
                .scale(self.inverse_scale),
        }
    }

    pub fn trace(&self, token: EntityToken, query: &mut TraceQuery) {
        let parent_ray = query.ray;

        query.ray = self.localize(parent_ray);
        query.distance *= self.forward_scale;
        query.current.push(token);

        self.pack.trace(query);

        query.current.pop();
        query.distance *= self.inverse_scale;
        query.ray = parent_ray;
    }

    pub fn occlude(&self, token: EntityToken, query: &mut OccludeQuery) -> bool {
        let parent_ray = query.ray;

        query.ray = self.localize(parent_ray);
        query.travel *= self.forward_scale;
        query.current.push(token);

        let occluded = self.pack.occlude(query);

        query.current.pop();
        query.travel *= self.inverse_scale;
        query.ray = parent_ray;

        occluded
    }

    pub fn trace_cost(&self, ray: Ray, distance: &mut f32) -> u32 {
        let local_ray = self.localize(ray);
        *distance *= self.forward_scale;
        let cost = self.pack.trace_cost(local_ray, distance);
        *distance *= self.inverse_scale;
        cost
    }
}
