use crate::color::RGB128;
use crate::distribution::Sample2D;
use crate::material::bsdf::{abs_cos_theta, cos_theta, Lobe, LobeType};
use crate::math::util::refract;
use crate::math::vector::Vec3f;

// Fraction of light reflected at a boundary, given the cosine of the
// incident angle measured against the boundary normal.
pub trait Fresnel {
    fn eval(&self, cos_theta_i: f32) -> RGB128;
}

/// Real-valued index of refraction; glass, water and the like. Transmits
/// whatever it does not reflect.
#[derive(Clone, Copy)]
pub struct Dielectric {
    eta_above: f32,
    eta_below: f32,
}

impl Dielectric {
    pub fn new(eta_above: f32, eta_below: f32) -> Self {
        Dielectric {
            eta_above,
            eta_below,
        }
    }
}

impl Fresnel for Dielectric {
    fn eval(&self, cos_theta_i: f32) -> RGB128 {
        RGB128::splat(fr_dielectric(cos_theta_i, self.eta_above, self.eta_below))
    }
}

/// Schlick's rational approximation of the dielectric term.
#[derive(Clone, Copy)]
pub struct SchlickDielectric {
    f0: f32,
}

impl SchlickDielectric {
    pub fn new(eta_above: f32, eta_below: f32) -> Self {
        let r = (eta_above - eta_below) / (eta_above + eta_below);
        SchlickDielectric { f0: r * r }
    }
}

impl Fresnel for SchlickDielectric {
    fn eval(&self, cos_theta_i: f32) -> RGB128 {
        let cos = cos_theta_i.abs().clamp(0., 1.);
        let inv = 1. - cos;
        let inv2 = inv * inv;
        RGB128::splat(self.f0 + (1. - self.f0) * inv2 * inv2 * inv)
    }
}

/// Complex index of refraction; metals absorb the transmitted portion so
/// only the reflected term survives.
#[derive(Clone, Copy)]
pub struct Conductor {
    eta: RGB128,
    k: RGB128,
}

impl Conductor {
    pub fn new(eta: RGB128, k: RGB128) -> Self {
        Conductor { eta, k }
    }
}

impl Fresnel for Conductor {
    fn eval(&self, cos_theta_i: f32) -> RGB128 {
        fr_conductor(cos_theta_i.abs(), self.eta, self.k)
    }
}

/// Reflects everything; used when no energy loss is desired.
#[derive(Clone, Copy)]
pub struct PerfectMirror;

impl Fresnel for PerfectMirror {
    fn eval(&self, _cos_theta_i: f32) -> RGB128 {
        RGB128::white()
    }
}

// Unpolarized dielectric reflectance: average of the parallel and
// perpendicular polarizations. A negative cosine means the ray is leaving
// the medium, so the indices swap.
pub fn fr_dielectric(cos_theta_i: f32, eta_above: f32, eta_below: f32) -> f32 {
    let cos_theta_i = cos_theta_i.clamp(-1., 1.);

    let (cos_theta_i, eta_i, eta_t) = if cos_theta_i < 0. {
        (-cos_theta_i, eta_below, eta_above)
    } else {
        (cos_theta_i, eta_above, eta_below)
    };

    let sin_theta_i = (1. - cos_theta_i * cos_theta_i).max(0.).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1. {
        // Total internal reflection.
        return 1.;
    }
    let cos_theta_t = (1. - sin_theta_t * sin_theta_t).max(0.).sqrt();

    let refl_parl = ((eta_t * cos_theta_i) - (eta_i * cos_theta_t))
        / ((eta_t * cos_theta_i) + (eta_i * cos_theta_t));
    let refl_perp = ((eta_i * cos_theta_i) - (eta_t * cos_theta_t))
        / ((eta_i * cos_theta_i) + (eta_t * cos_theta_t));

    (refl_parl * refl_parl + refl_perp * refl_perp) / 2.
}

// Conductor reflectance with a complex index eta + ik, relative to a unit
// exterior. With k = 0 this degenerates to the dielectric form.
pub fn fr_conductor(cos_theta_i: f32, eta: RGB128, k: RGB128) -> RGB128 {
    let cos_theta_i = cos_theta_i.clamp(-1., 1.);

    let cos2 = cos_theta_i * cos_theta_i;
    let sin2 = 1. - cos2;

    let eta2 = eta * eta;
    let k2 = k * k;

    let t0 = eta2 - k2 - RGB128::splat(sin2);
    let a2_plus_b2 = (t0 * t0 + (eta2 * k2).scale(4.)).sqrt();
    let t1 = a2_plus_b2 + RGB128::splat(cos2);
    let a = (a2_plus_b2 + t0).scale(0.5).sqrt();
    let t2 = a.scale(2. * cos_theta_i);
    let rs = div(t1 - t2, t1 + t2);

    let t3 = a2_plus_b2.scale(cos2) + RGB128::splat(sin2 * sin2);
    let t4 = t2.scale(sin2);
    let rp = rs * div(t3 - t4, t3 + t4);

    (rp + rs).scale(0.5)
}

fn div(a: RGB128, b: RGB128) -> RGB128 {
    RGB128::new(a.r / b.r, a.g / b.g, a.b / b.b)
}

/// Delta reflection lobe: eval and pdf vanish for every concrete direction
/// pair, sampling returns the single mirror direction.
pub struct SpecularReflection<F: Fresnel> {
    fresnel: F,
    albedo: RGB128,
}

impl<F: Fresnel> SpecularReflection<F> {
    const LOBE_TYPE: LobeType = LobeType::REFLECTION.union(LobeType::SPECULAR);

    pub fn new(albedo: RGB128, fresnel: F) -> Self {
        SpecularReflection { fresnel, albedo }
    }
}

impl<F: Fresnel> Lobe for SpecularReflection<F> {
    fn get_type(&self) -> LobeType {
        Self::LOBE_TYPE
    }

    fn eval(&self, _wo: Vec3f, _wi: Vec3f) -> RGB128 {
        RGB128::black()
    }

    fn pdf(&self, _wo: Vec3f, _wi: Vec3f) -> f64 {
        0.
    }

    fn sample(&self, wo: Vec3f, _u: Sample2D) -> (RGB128, Vec3f, f64) {
        // reflect(wo, n) with n = +Z in shading space.
        let wi = Vec3f {
            x: -wo.x,
            y: -wo.y,
            z: wo.z,
        };
        let cos = abs_cos_theta(wi);
        if cos == 0. {
            return (RGB128::black(), wi, 0.);
        }

        let value = (self.fresnel.eval(cos_theta(wi)) * self.albedo).scale(1. / cos);
        (value, wi, 1.)
    }
}

/// Delta transmission lobe through a dielectric boundary.
pub struct SpecularTransmission {
    fresnel: Dielectric,
    albedo: RGB128,
    eta_above: f32,
    eta_below: f32,
}

impl SpecularTransmission {
    const LOBE_TYPE: LobeType = LobeType::TRANSMISSION.union(LobeType::SPECULAR);

    pub fn new(albedo: RGB128, eta_above: f32, eta_below: f32) -> Self {
        SpecularTransmission {
            fresnel: Dielectric::new(eta_above, eta_below),
            albedo,
            eta_above,
            eta_below,
        }
    }
}

impl Lobe for SpecularTransmission {
    fn get_type(&self) -> LobeType {
        Self::LOBE_TYPE
    }

    fn eval(&self, _wo: Vec3f, _wi: Vec3f) -> RGB128 {
        RGB128::black()
    }

    fn pdf(&self, _wo: Vec3f, _wi: Vec3f) -> f64 {
        0.
    }

    fn sample(&self, wo: Vec3f, _u: Sample2D) -> (RGB128, Vec3f, f64) {
        // Entering or leaving decides which index is on the incident side.
        let entering = cos_theta(wo) > 0.;
        let (eta_i, eta_t) = if entering {
            (self.eta_above, self.eta_below)
        } else {
            (self.eta_below, self.eta_above)
        };
        let normal = Vec3f {
            x: 0.,
            y: 0.,
            z: if entering { 1. } else { -1. },
        };

        let wi = match refract(wo, normal, eta_i / eta_t) {
            Some(wi) => wi,
            // Total internal reflection carries no transmitted energy.
            None => return (RGB128::black(), Vec3f::zero(), 0.),
        };

        let cos = abs_cos_theta(wi);
        if cos == 0. {
            return (RGB128::black(), wi, 0.);
        }

        let fresnel = self.fresnel.eval(cos_theta(wi));
        let value = (self.albedo * (RGB128::white() - fresnel))
            .scale((eta_i * eta_i) / (eta_t * eta_t * cos));
        (value, wi, 1.)
    }
}

/// Reflection and transmission combined, choosing stochastically with the
/// Fresnel weight so each pick stays unit-probability within its branch.
pub struct FresnelSpecular {
    reflect_albedo: RGB128,
    transmit_albedo: RGB128,
    eta_above: f32,
    eta_below: f32,
}

impl FresnelSpecular {
    const LOBE_TYPE: LobeType = LobeType::REFLECTION
        .union(LobeType::TRANSMISSION)
        .union(LobeType::SPECULAR);

    pub fn new(
        reflect_albedo: RGB128,
        transmit_albedo: RGB128,
        eta_above: f32,
        eta_below: f32,
    ) -> Self {
        FresnelSpecular {
            reflect_albedo,
            transmit_albedo,
            eta_above,
            eta_below,
        }
    }
}

impl Lobe for FresnelSpecular {
    fn get_type(&self) -> LobeType {
        Self::LOBE_TYPE
    }

    fn eval(&self, _wo: Vec3f, _wi: Vec3f) -> RGB128 {
        RGB128::black()
    }

    fn pdf(&self, _wo: Vec3f, _wi: Vec3f) -> f64 {
        0.
    }

    fn sample(&self, wo: Vec3f, u: Sample2D) -> (RGB128, Vec3f, f64) {
        let fresnel = fr_dielectric(cos_theta(wo), self.eta_above, self.eta_below);

        if (u.value().x as f32) < fresnel {
            let wi = Vec3f {
                x: -wo.x,
                y: -wo.y,
                z: wo.z,
            };
            let cos = abs_cos_theta(wi);
            if cos == 0. {
                return (RGB128::black(), wi, 0.);
            }
            let value = self.reflect_albedo.scale(fresnel / cos);
            (value, wi, fresnel as f64)
        } else {
            let transmission =
                SpecularTransmission::new(self.transmit_albedo, self.eta_above, self.eta_below);
            let (value, wi, pdf) = transmission.sample(wo, u);
            if pdf == 0. {
                return (RGB128::black(), wi, 0.);
            }
            (value.scale(1. - fresnel), wi, (1. - fresnel) as f64)
        }
    }
}
