use crate::color::RGB128;
use crate::distribution::{DiscreteDistribution2D, Probable, Sample2D};
use crate::math::vector::{Vec2d, Vec3f};
use crate::texture::Grid;

use std::f64::consts::PI;

// Solid angle covered by the whole unit square under the cylindrical
// mapping: dOmega = 2 pi^2 sin(phi) du dv.
const DOMAIN: f64 = 2. * PI * PI;

/// An environment texture importance-sampled through a precomputed 2D
/// distribution. Rows are weighted by the sine of their polar angle, the
/// Jacobian of the cylindrical parameterization, so texels near the poles
/// do not dominate despite covering almost no solid angle.
pub struct DirectionalTexture {
    texture: Grid,
    distribution: DiscreteDistribution2D,
    average: RGB128,
}

impl DirectionalTexture {
    pub fn new(texture: Grid) -> Self {
        let (width, height) = (texture.width(), texture.height());

        let mut weights = Vec::with_capacity(width * height);
        let mut sum = RGB128::black();
        for y in 0..height {
            let sin_phi = (PI * (y as f64 + 0.5) / height as f64).sin();
            for x in 0..width {
                let texel = texture.get(x, y);
                weights.push(texel.luminance() as f64 * sin_phi);
                sum += texel.scale(sin_phi as f32);
            }
        }

        let average = sum.scale((DOMAIN / (width * height) as f64) as f32);
        let distribution = DiscreteDistribution2D::new(&weights, width, height);

        DirectionalTexture {
            texture,
            distribution,
            average,
        }
    }

    /// Integral of the radiance over the sphere of directions.
    pub fn average(&self) -> RGB128 {
        self.average
    }

    /// Draws a world direction toward the bright parts of the texture.
    /// Degenerate when the sampled row collapses at a pole.
    pub fn sample(&self, sample: Sample2D) -> (Probable<Vec3f>, RGB128) {
        let uv = self.distribution.sample(sample.value());
        let (direction, sin_phi) = direction_of(uv.value);
        if sin_phi <= 0. {
            return (Probable::impossible(Vec3f::zero()), RGB128::black());
        }

        let pdf = uv.pdf / (DOMAIN * sin_phi);
        let value = self.texture.sample(uv.value.to_f32());
        (Probable::new(direction, pdf), value)
    }

    /// Radiance arriving from `direction` (unit length).
    pub fn evaluate(&self, direction: Vec3f) -> RGB128 {
        self.texture.sample(uv_of(direction).to_f32())
    }

    /// Density `sample` would have returned for this direction.
    pub fn probability_density(&self, direction: Vec3f) -> f64 {
        let sin_phi = (1. - (direction.y as f64).powi(2)).max(0.).sqrt();
        if sin_phi <= 0. {
            return 0.;
        }
        self.distribution.probability_density(uv_of(direction)) / (DOMAIN * sin_phi)
    }
}

// (theta, phi) = (2 pi u, pi v), direction spun so that v = 0.5 maps to
// the horizon and the poles sit at v = 0 and v = 1.
fn direction_of(uv: Vec2d) -> (Vec3f, f64) {
    let theta = 2. * PI * uv.x;
    let phi = PI * uv.y;
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();

    let direction = Vec3f {
        x: (-sin_phi * sin_theta) as f32,
        y: (-cos_phi) as f32,
        z: (-sin_phi * cos_theta) as f32,
    };
    (direction, sin_phi)
}

fn uv_of(direction: Vec3f) -> Vec2d {
    let phi = (-direction.y as f64).clamp(-1., 1.).acos();
    let theta = (-direction.x as f64).atan2(-direction.z as f64);
    let u = theta / (2. * PI);
    let u = if u < 0. { u + 1. } else { u };
    Vec2d::new(u.min(crate::math::random::RandGen::ONE_MINUS_EPS), phi / PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::random::RandGen;

    fn delta_texture() -> DirectionalTexture {
        // A single bright texel at (0.5, 0.5) on an otherwise black sphere.
        let grid = Grid::from_fn(64, 64, |x, y| {
            if x == 32 && y == 32 {
                RGB128::splat(100.)
            } else {
                RGB128::black()
            }
        });
        DirectionalTexture::new(grid)
    }

    #[test]
    fn delta_spot_samples_its_direction() {
        let texture = delta_texture();
        let mut rng = RandGen::new(3);

        for _ in 0..64 {
            let (direction, value) = texture.sample(Sample2D::new(rng.uniform_vec2()));
            assert!(!direction.is_impossible());
            // (u, v) = (0.5, 0.5) maps to +Y up at the horizon center.
            assert!((direction.value - Vec3f::new(0., 0., 1.)).length() < 0.1);
            assert!(value.luminance() > 0.);
            // Vastly more concentrated than a uniform sphere.
            assert!(direction.pdf > 10. * crate::math::sampling::pdf_uniform_sphere());
        }
    }

    #[test]
    fn mapping_round_trips() {
        let mut rng = RandGen::new(7);
        for _ in 0..128 {
            let uv = rng.uniform_vec2();
            let (direction, sin_phi) = direction_of(uv);
            if sin_phi < 1e-3 {
                continue;
            }
            let back = uv_of(direction);
            assert!((back.x - uv.x).abs() < 1e-4, "{} vs {}", back.x, uv.x);
            assert!((back.y - uv.y).abs() < 1e-4, "{} vs {}", back.y, uv.y);
        }
    }

    #[test]
    fn pdf_positive_exactly_where_texture_is_bright() {
        let texture = delta_texture();
        let bright = Vec3f::new(0., 0., 1.);
        let dark = Vec3f::new(0., 0., -1.);
        assert!(texture.probability_density(bright) > 0.);
        assert_eq!(texture.probability_density(dark), 0.);
        assert!(texture.evaluate(bright).luminance() > 0.);
        assert!(texture.evaluate(dark).is_black());
    }

    #[test]
    fn pdf_integrates_to_one_over_the_sphere() {
        let grid = Grid::from_fn(32, 32, |x, y| RGB128::splat((x + 2 * y + 1) as f32));
        let texture = DirectionalTexture::new(grid);

        // Riemann sum over (u, v) of pdf(direction(u, v)) * dOmega.
        let n = 256;
        let mut sum = 0f64;
        for yi in 0..n {
            for xi in 0..n {
                let uv = Vec2d::new(
                    (xi as f64 + 0.5) / n as f64,
                    (yi as f64 + 0.5) / n as f64,
                );
                let (direction, sin_phi) = direction_of(uv);
                if sin_phi <= 0. {
                    continue;
                }
                let pdf = texture.probability_density(direction);
                sum += pdf * DOMAIN * sin_phi / (n * n) as f64;
            }
        }
        assert!((sum - 1.).abs() < 1e-3, "integrated to {}", sum);
    }

    #[test]
    fn average_of_uniform_sky_is_its_radiance_times_sphere_area() {
        let grid = Grid::from_fn(16, 16, |_, _| RGB128::splat(1.));
        let texture = DirectionalTexture::new(grid);
        // Sum of sin over rows converges to the 4 pi sphere integral.
        let expect = 4. * PI as f64;
        assert!((texture.average().r as f64 - expect).abs() < expect * 0.01);
    }
}
