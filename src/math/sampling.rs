// Shared warping functions between the samplers and the shading layer.

use crate::math::vector::{Vec2, Vec2d, Vec3, Vec3d};

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub const INV_PI: f64 = 1. / PI;
pub const INV_2PI: f64 = 1. / (2. * PI);
pub const INV_4PI: f64 = 1. / (4. * PI);

pub fn concentric_sample_disk(u: Vec2d) -> Vec2d {
    // Map to [-1, 1]^2:
    let u_offset = u.scale(2.) - Vec2::splat(1.);
    if u_offset.x == 0. && u_offset.y == 0. {
        return Vec2::zero();
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, FRAC_PI_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, FRAC_PI_2 - FRAC_PI_4 * (u_offset.x / u_offset.y))
    };

    Vec2 {
        x: r * theta.cos(),
        y: r * theta.sin(),
    }
}

pub fn cos_sample_hemisphere(u: Vec2d) -> Vec3d {
    let d = concentric_sample_disk(u);
    let z = (1. - d.x * d.x - d.y * d.y).max(0.).sqrt();
    Vec3 { x: d.x, y: d.y, z }
}

pub fn pdf_cos_hemisphere(cos_theta: f64) -> f64 {
    cos_theta * INV_PI
}

pub fn uniform_sample_sphere(u: Vec2d) -> Vec3d {
    let z = 1. - 2. * u.x;
    let r = (1. - z * z).max(0.).sqrt();
    let phi = 2. * PI * u.y;
    Vec3 {
        x: r * phi.cos(),
        y: r * phi.sin(),
        z,
    }
}

pub fn pdf_uniform_sphere() -> f64 {
    INV_4PI
}

/// Uniform barycentric coordinates over a triangle.
pub fn uniform_sample_triangle(u: Vec2d) -> Vec2d {
    let sqrt_u = u.x.sqrt();
    Vec2 {
        x: 1. - sqrt_u,
        y: u.y * sqrt_u,
    }
}

/// The i-th of `count` points on a golden-ratio spiral filling the unit
/// square. The square-to-disk correction keeps the radial density uniform
/// after the spiral is folded back into the square.
pub fn golden_spiral(i: usize, count: usize) -> Vec2d {
    const PHI: f64 = 1.618033988749895;

    let theta = 2. * PI * PHI * i as f64;
    let square = 1. / ((theta + FRAC_PI_4).cos().abs() + (theta + FRAC_PI_4).sin().abs());
    let r = ((i as f64 + 0.5) / count as f64).sqrt() * 2f64.sqrt() * square / 2.;

    Vec2 {
        x: r * theta.cos() + 0.5,
        y: r * theta.sin() + 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_hemisphere_points_up() {
        let mut rng = crate::math::random::RandGen::new(11);
        for _ in 0..256 {
            let w = cos_sample_hemisphere(rng.uniform_vec2());
            assert!(w.z >= 0.);
            assert!((w.length() - 1.).abs() < 1e-9);
        }
    }

    #[test]
    fn triangle_samples_stay_inside() {
        let mut rng = crate::math::random::RandGen::new(12);
        for _ in 0..256 {
            let b = uniform_sample_triangle(rng.uniform_vec2());
            assert!(b.x >= 0. && b.y >= 0. && b.x + b.y <= 1. + 1e-12);
        }
    }

    #[test]
    fn spiral_points_stay_in_unit_square() {
        for i in 0..64 {
            let p = golden_spiral(i, 64);
            assert!(p.x > -1e-9 && p.x < 1. + 1e-9, "x out of range: {}", p.x);
            assert!(p.y > -1e-9 && p.y < 1. + 1e-9, "y out of range: {}", p.y);
        }
    }
}
