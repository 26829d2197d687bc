use crate::material::MaterialIndex;
use crate::math::bbox::BBox3;
use crate::math::ray::Ray;
use crate::math::sampling::uniform_sample_sphere;
use crate::math::util::quadratic;
use crate::math::vector::{Vec2d, Vec2f, Vec3f};

use std::f32::consts::PI;

#[derive(Clone, Debug)]
pub struct PreparedSphere {
    pub center: Vec3f,
    pub radius: f32,
    pub material: MaterialIndex,
}

impl PreparedSphere {
    pub fn new(center: Vec3f, radius: f32, material: MaterialIndex) -> Self {
        debug_assert!(radius > 0.);
        PreparedSphere {
            center,
            radius,
            material,
        }
    }

    pub fn area(&self) -> f32 {
        4. * PI * self.radius * self.radius
    }

    pub fn bounds(&self) -> BBox3 {
        BBox3::from_pnts(
            self.center - Vec3f::splat(self.radius),
            self.center + Vec3f::splat(self.radius),
        )
    }

    /// Nearest positive root of `|o + t d - c|^2 = r^2`, or infinity.
    /// `find_far` selects the far root instead; shadow rays leaving an
    /// emissive sphere toward itself use it to skip the self-hit.
    pub fn intersect(&self, ray: Ray, find_far: bool) -> f32 {
        // Shift the origin so the quadratic is centered at zero; this
        // keeps the coefficients small near the sphere.
        let oc = ray.org - self.center;
        let a = ray.dir.dot(ray.dir);
        let b = 2. * oc.dot(ray.dir);
        let c = oc.dot(oc) - self.radius * self.radius;

        let (t0, t1) = match quadratic(a, b, c) {
            Some(roots) => roots,
            None => return f32::INFINITY,
        };

        if find_far {
            return if t1 >= 0. { t1 } else { f32::INFINITY };
        }
        if t0 >= 0. {
            t0
        } else if t1 >= 0. {
            t1
        } else {
            f32::INFINITY
        }
    }

    pub fn intersect_occlude(&self, ray: Ray, travel: f32) -> bool {
        let t = self.intersect(ray, false);
        t < travel
    }

    pub fn normal_at(&self, point: Vec3f) -> Vec3f {
        (point - self.center).scale(1. / self.radius)
    }

    /// Cylindrical-equirectangular texture coordinates of a surface point.
    pub fn texcoord_at(&self, point: Vec3f) -> Vec2f {
        let local = self.normal_at(point);
        let phi = local.y.atan2(local.x);
        let theta = local.z.clamp(-1., 1.).acos();
        Vec2f {
            x: (phi + PI) / (2. * PI),
            y: theta / PI,
        }
    }

    /// Uniform point on the surface and its outward normal.
    pub fn sample(&self, u: Vec2d) -> (Vec3f, Vec3f) {
        let normal = uniform_sample_sphere(u).to_f32();
        (self.center + normal.scale(self.radius), normal)
    }

    /// Solid-angle density of a sampled surface point from `origin`.
    pub fn pdf_from(&self, origin: Vec3f, point: Vec3f, normal: Vec3f) -> f32 {
        let to_point = point - origin;
        let distance2 = to_point.length2();
        if distance2 == 0. {
            return 0.;
        }
        let cos = normal.dot(to_point.normalize()).abs();
        if cos == 0. {
            return 0.;
        }
        distance2 / (cos * self.area())
    }
}
