use crate::color::RGB128;
use crate::material::bsdf::{Lobe, LobeType};
use crate::math::sampling::INV_PI;
use crate::math::vector::Vec3f;

/// Uniform diffuse reflection: the same radiance leaves in every direction.
pub struct LambertianReflection {
    albedo: RGB128,
}

impl LambertianReflection {
    const LOBE_TYPE: LobeType = LobeType::REFLECTION.union(LobeType::DIFFUSE);

    pub fn new(albedo: RGB128) -> Self {
        LambertianReflection { albedo }
    }
}

impl Lobe for LambertianReflection {
    fn get_type(&self) -> LobeType {
        Self::LOBE_TYPE
    }

    fn eval(&self, _wo: Vec3f, _wi: Vec3f) -> RGB128 {
        self.albedo.scale(INV_PI as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Sample2D;
    use crate::material::bsdf::abs_cos_theta;
    use crate::math::random::RandGen;
    use crate::math::vector::Vec3;

    #[test]
    fn reflectance_integrates_to_albedo() {
        let lobe = LambertianReflection::new(RGB128::splat(0.8));
        let wo = Vec3::new(0., 0., 1.);
        let mut rng = RandGen::new(31);

        let n = 4096;
        let mut estimate = 0f64;
        for _ in 0..n {
            let (f, wi, pdf) = lobe.sample(wo, Sample2D::new(rng.uniform_vec2()));
            if pdf > 0. {
                estimate += f.r as f64 * abs_cos_theta(wi) as f64 / pdf;
            }
        }
        estimate /= n as f64;
        assert!((estimate - 0.8).abs() < 0.02, "estimate {}", estimate);
    }
}
