use crate::color::RGB128;
use crate::math::summation::Summation;
use crate::math::vector::{Vec3d, Vec3f};

/// Online per-pixel estimator. Mean and squared deviation update in double
/// precision with Welford's recurrence, so the variance stays stable no
/// matter how many samples land. Non-finite samples never touch the
/// estimate; they are only counted.
#[derive(Clone, Debug, Default)]
pub struct Pixel {
    mean: Vec3d,
    m2: Vec3d,
    count: u32,
    rejected: u32,

    albedo: Summation,
    normal: Summation,
    aux_count: u32,
}

impl Pixel {
    // Dim pixels would explode the normalized deviation; the mean is
    // floored here before dividing.
    const DEVIATION_FLOOR: f64 = 0.3;

    pub fn new() -> Self {
        Pixel::default()
    }

    /// Folds one sample in; false means the sample was not finite and was
    /// rejected instead.
    pub fn accumulate(&mut self, value: RGB128) -> bool {
        if !value.is_finite() {
            self.rejected += 1;
            return false;
        }

        let value = value.to_vec3d();
        self.count += 1;
        let n = self.count as f64;

        let delta = value - self.mean;
        self.mean += delta.scale(1. / n);
        self.m2 += delta * (value - self.mean);

        true
    }

    pub fn accumulate_aux(&mut self, albedo: RGB128, normal: Vec3f) {
        self.albedo.add(albedo.to_vec3d());
        self.normal.add(normal.to_f64());
        self.aux_count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn mean(&self) -> RGB128 {
        RGB128::from_vec3d(self.mean)
    }

    /// Population variance of the accumulated samples.
    pub fn variance(&self) -> Vec3d {
        if self.count == 0 {
            return Vec3d::zero();
        }
        self.m2.scale(1. / self.count as f64)
    }

    /// Normalized standard deviation driving the adaptive pass: noisy
    /// pixels report high, converged or dim pixels report near zero.
    pub fn deviation(&self) -> f64 {
        if self.count == 0 {
            return 0.;
        }
        let average = |v: Vec3d| (v.x + v.y + v.z) / 3.;
        let deviation = (average(self.m2) / self.count as f64).sqrt();
        deviation / average(self.mean).max(Self::DEVIATION_FLOOR)
    }

    pub fn albedo(&self) -> RGB128 {
        if self.aux_count == 0 {
            return RGB128::black();
        }
        RGB128::from_vec3d(self.albedo.total().scale(1. / self.aux_count as f64))
    }

    pub fn normal(&self) -> Vec3f {
        let total = self.normal.total();
        if total.length2() == 0. {
            return Vec3f::zero();
        }
        total.normalize().to_f32()
    }
}
