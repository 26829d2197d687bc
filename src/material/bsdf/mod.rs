pub mod lambertian;
pub mod specular;

use crate::color::RGB128;
use crate::distribution::Sample2D;
use crate::math::sampling::{cos_sample_hemisphere, pdf_cos_hemisphere};
use crate::math::util::coord_system;
use crate::math::vector::Vec3f;

use bitflags::bitflags;
use bumpalo::Bump;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct LobeType: u32 {
        const REFLECTION = 1 << 0;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
        const ALL = Self::REFLECTION.bits()
            | Self::TRANSMISSION.bits()
            | Self::DIFFUSE.bits()
            | Self::GLOSSY.bits()
            | Self::SPECULAR.bits();
    }
}

impl LobeType {
    pub fn is_delta(self) -> bool {
        self.contains(LobeType::SPECULAR)
    }
}

/// One scattering component in shading space (normal along +Z). Lobes are
/// plain data allocated from the per-worker arena; they are dropped by
/// resetting the arena, never individually.
pub trait Lobe {
    fn matches_type(&self, lobe_type: LobeType) -> bool {
        self.get_type().intersects(lobe_type) && lobe_type.contains(self.get_type())
    }

    fn get_type(&self) -> LobeType;

    fn eval(&self, wo: Vec3f, wi: Vec3f) -> RGB128;

    // Default cosine-hemisphere sampling; delta lobes override with their
    // analytic direction and a pdf of one.
    fn sample(&self, wo: Vec3f, u: Sample2D) -> (RGB128, Vec3f, f64) {
        let wi = cos_sample_hemisphere(u.value()).to_f32();
        // Flip into wo's hemisphere; shading space normals face +Z.
        let wi = if wo.z < 0. {
            Vec3f {
                x: wi.x,
                y: wi.y,
                z: -wi.z,
            }
        } else {
            wi
        };
        (self.eval(wo, wi), wi, self.pdf(wo, wi))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> f64 {
        if is_in_same_hemisphere(wo, wi) {
            pdf_cos_hemisphere(abs_cos_theta(wi) as f64)
        } else {
            0.
        }
    }
}

/// The set of lobes a material attaches to a hit, together with the local
/// shading frame. Lives in the per-sample arena.
pub struct Bsdf<'a> {
    lobes: bumpalo::collections::Vec<'a, &'a dyn Lobe>,
    normal: Vec3f,
    tangent: Vec3f,
    bitangent: Vec3f,
}

impl<'a> Bsdf<'a> {
    pub fn new_in(arena: &'a Bump, shading_normal: Vec3f) -> Self {
        let (tangent, bitangent) = coord_system(shading_normal);
        Bsdf {
            lobes: bumpalo::collections::Vec::new_in(arena),
            normal: shading_normal,
            tangent,
            bitangent,
        }
    }

    pub fn add(&mut self, lobe: &'a dyn Lobe) {
        self.lobes.push(lobe);
    }

    pub fn count(&self) -> usize {
        self.lobes.len()
    }

    pub fn world_to_local(&self, v: Vec3f) -> Vec3f {
        Vec3f {
            x: v.dot(self.tangent),
            y: v.dot(self.bitangent),
            z: v.dot(self.normal),
        }
    }

    pub fn local_to_world(&self, v: Vec3f) -> Vec3f {
        Vec3f {
            x: self.tangent.x * v.x + self.bitangent.x * v.y + self.normal.x * v.z,
            y: self.tangent.y * v.x + self.bitangent.y * v.y + self.normal.y * v.z,
            z: self.tangent.z * v.x + self.bitangent.z * v.y + self.normal.z * v.z,
        }
    }

    /// Evaluates the summed non-delta response for a known pair of
    /// world-space directions.
    pub fn eval(&self, wo_world: Vec3f, wi_world: Vec3f) -> RGB128 {
        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0. {
            return RGB128::black();
        }

        self.lobes
            .iter()
            .filter(|lobe| !lobe.get_type().is_delta())
            .fold(RGB128::black(), |sum, lobe| sum + lobe.eval(wo, wi))
    }

    /// Samples one lobe uniformly and folds in the remaining matching
    /// lobes. Returns `(f, wi_world, pdf, sampled type)`; a zero pdf means
    /// the set is degenerate in that direction.
    pub fn sample(&self, wo_world: Vec3f, u: Sample2D) -> (RGB128, Vec3f, f64, LobeType) {
        if self.lobes.is_empty() {
            return (RGB128::black(), Vec3f::zero(), 0., LobeType::empty());
        }

        let uv = u.value();
        let picked = ((uv.x * self.lobes.len() as f64) as usize).min(self.lobes.len() - 1);
        let lobe = self.lobes[picked];
        // Reuse the selector dimension by rescaling it into [0, 1).
        let remapped = Sample2D::new(crate::math::vector::Vec2d {
            x: (uv.x * self.lobes.len() as f64 - picked as f64).min(crate::math::random::RandGen::ONE_MINUS_EPS),
            y: uv.y,
        });

        let wo = self.world_to_local(wo_world);
        if wo.z == 0. {
            return (RGB128::black(), Vec3f::zero(), 0., lobe.get_type());
        }

        let (mut f, wi, mut pdf) = lobe.sample(wo, remapped);
        if pdf == 0. {
            return (RGB128::black(), Vec3f::zero(), 0., lobe.get_type());
        }

        // Non-delta picks share probability mass with the other lobes.
        if !lobe.get_type().is_delta() && self.lobes.len() > 1 {
            for (i, other) in self.lobes.iter().enumerate() {
                if i != picked && !other.get_type().is_delta() {
                    pdf += other.pdf(wo, wi);
                    f = f + other.eval(wo, wi);
                }
            }
        }
        pdf /= self.lobes.len() as f64;

        (f, self.local_to_world(wi), pdf, lobe.get_type())
    }

    pub fn pdf(&self, wo_world: Vec3f, wi_world: Vec3f) -> f64 {
        if self.lobes.is_empty() {
            return 0.;
        }
        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);

        let sum: f64 = self.lobes.iter().map(|lobe| lobe.pdf(wo, wi)).sum();
        sum / self.lobes.len() as f64
    }
}

// Shading-space trigonometry. The frame normal is +Z, so these read angles
// straight off the components; the phi pair guards the sin_theta = 0 pole.

pub fn is_in_same_hemisphere(w: Vec3f, wp: Vec3f) -> bool {
    w.z * wp.z > 0.
}

pub fn cos_theta(w: Vec3f) -> f32 {
    w.z
}

pub fn cos2_theta(w: Vec3f) -> f32 {
    w.z * w.z
}

pub fn abs_cos_theta(w: Vec3f) -> f32 {
    w.z.abs()
}

pub fn sin2_theta(w: Vec3f) -> f32 {
    (1. - cos2_theta(w)).max(0.)
}

pub fn sin_theta(w: Vec3f) -> f32 {
    sin2_theta(w).sqrt()
}

pub fn tangent_theta(w: Vec3f) -> f32 {
    sin_theta(w) / cos_theta(w)
}

pub fn cos_phi(w: Vec3f) -> f32 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0. {
        1.
    } else {
        (w.x / sin_theta).clamp(-1., 1.)
    }
}

pub fn sin_phi(w: Vec3f) -> f32 {
    let sin_theta = sin_theta(w);
    if sin_theta == 0. {
        0.
    } else {
        (w.y / sin_theta).clamp(-1., 1.)
    }
}

#[cfg(test)]
mod tests {
    use super::lambertian::LambertianReflection;
    use super::*;
    use crate::math::random::RandGen;
    use crate::math::vector::Vec3;

    #[test]
    fn phi_helpers_survive_the_pole() {
        let up = Vec3::new(0., 0., 1.);
        assert_eq!(cos_phi(up), 1.);
        assert_eq!(sin_phi(up), 0.);
    }

    #[test]
    fn frame_round_trips_directions() {
        let arena = Bump::new();
        let normal = Vec3::new(0.3, -0.5, 0.81).normalize();
        let bsdf = Bsdf::new_in(&arena, normal);

        let v = Vec3::new(0.7, 0.1, -0.2).normalize();
        let round = bsdf.local_to_world(bsdf.world_to_local(v));
        assert!((round - v).length() < 1e-6);

        // The shading normal maps to +Z.
        let local_n = bsdf.world_to_local(normal);
        assert!((local_n.z - 1.).abs() < 1e-6);
    }

    #[test]
    fn sampled_directions_agree_with_pdf() {
        let arena = Bump::new();
        let normal = Vec3::new(0., 0., 1.);
        let mut bsdf = Bsdf::new_in(&arena, normal);
        bsdf.add(arena.alloc(LambertianReflection::new(RGB128::splat(0.5))));

        let wo = Vec3::new(0.2, 0.1, 0.9).normalize();
        let mut rng = RandGen::new(23);
        for _ in 0..128 {
            let u = Sample2D::new(rng.uniform_vec2());
            let (f, wi, pdf, _) = bsdf.sample(wo, u);
            assert!(pdf > 0.);
            assert!(!f.is_black());
            let expect = bsdf.pdf(wo, wi);
            assert!((pdf - expect).abs() < 1e-9);
        }
    }
}
