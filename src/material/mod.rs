pub mod bsdf;

use crate::color::RGB128;
use crate::material::bsdf::lambertian::LambertianReflection;
use crate::material::bsdf::specular::{FresnelSpecular, PerfectMirror, SpecularReflection};
use crate::material::bsdf::Bsdf;
use crate::math::vector::{Vec2f, Vec3f};

use bumpalo::Bump;

use std::f32::consts::PI;

/// Dense index into a prepared swatch. Assigned by the swatch extractor,
/// compact per pack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterialIndex(pub u32);

impl MaterialIndex {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Everything the evaluator knows about a surface hit: the world-space
/// geometry of the contact and the scattering set the material attached.
pub struct Touch<'a> {
    pub point: Vec3f,
    /// Geometric normal from the primitive itself.
    pub normal: Vec3f,
    /// Interpolated shading normal; equals `normal` when flat.
    pub shading_normal: Vec3f,
    /// World-space direction the light leaves along (toward the previous
    /// path vertex).
    pub outgoing: Vec3f,
    pub uv: Vec2f,
    pub material: &'a dyn Material,
    pub bsdf: Option<&'a Bsdf<'a>>,
}

/// A surface response. `scatter` populates `touch.bsdf` from the per-worker
/// arena; leaving it empty means the surface does not interact and the path
/// continues straight through.
pub trait Material: Send + Sync {
    fn scatter<'a>(&'a self, touch: &mut Touch<'a>, arena: &'a Bump);

    /// Flat reflectance estimate for the auxiliary albedo layer.
    fn albedo(&self) -> RGB128;

    fn as_emissive(&self) -> Option<&dyn Emissive> {
        None
    }

    fn is_emissive(&self) -> bool {
        self.as_emissive()
            .map(|e| e.emission().max_component() > 0.)
            .unwrap_or(false)
    }
}

/// Surfaces that radiate. Power feeds the preparation-time importance
/// tables; emission is what a path picks up on contact.
pub trait Emissive {
    fn emission(&self) -> RGB128;

    /// Radiance toward `outgoing` from the point `origin` on the surface.
    fn emit(&self, origin: Vec3f, outgoing: Vec3f) -> RGB128;

    /// Radiant exitance per unit area, the weight multiplied by surface
    /// area in the power tables.
    fn power(&self) -> f32 {
        self.emission().luminance() * PI
    }
}

/// Lambertian-only surface.
pub struct Matte {
    albedo: RGB128,
}

impl Matte {
    pub fn new(albedo: RGB128) -> Self {
        Matte { albedo }
    }
}

impl Material for Matte {
    fn scatter<'a>(&'a self, touch: &mut Touch<'a>, arena: &'a Bump) {
        let mut bsdf = Bsdf::new_in(arena, touch.shading_normal);
        bsdf.add(arena.alloc(LambertianReflection::new(self.albedo)));
        touch.bsdf = Some(arena.alloc(bsdf));
    }

    fn albedo(&self) -> RGB128 {
        self.albedo
    }
}

/// Perfect mirror.
pub struct Mirror {
    albedo: RGB128,
}

impl Mirror {
    pub fn new(albedo: RGB128) -> Self {
        Mirror { albedo }
    }
}

impl Material for Mirror {
    fn scatter<'a>(&'a self, touch: &mut Touch<'a>, arena: &'a Bump) {
        let mut bsdf = Bsdf::new_in(arena, touch.shading_normal);
        bsdf.add(arena.alloc(SpecularReflection::new(self.albedo, PerfectMirror)));
        touch.bsdf = Some(arena.alloc(bsdf));
    }

    fn albedo(&self) -> RGB128 {
        self.albedo
    }
}

/// Thin dielectric with Fresnel-weighted reflection and transmission.
pub struct Glass {
    albedo: RGB128,
    eta: f32,
}

impl Glass {
    pub fn new(albedo: RGB128, eta: f32) -> Self {
        Glass { albedo, eta }
    }
}

impl Material for Glass {
    fn scatter<'a>(&'a self, touch: &mut Touch<'a>, arena: &'a Bump) {
        let mut bsdf = Bsdf::new_in(arena, touch.shading_normal);
        bsdf.add(arena.alloc(FresnelSpecular::new(self.albedo, self.albedo, 1., self.eta)));
        touch.bsdf = Some(arena.alloc(bsdf));
    }

    fn albedo(&self) -> RGB128 {
        self.albedo
    }
}

/// Pure emitter: radiates uniformly from its front face and does not
/// scatter, so paths continue through after collecting the emission.
pub struct Emitter {
    emission: RGB128,
}

impl Emitter {
    pub fn new(emission: RGB128) -> Self {
        Emitter { emission }
    }
}

impl Material for Emitter {
    fn scatter<'a>(&'a self, touch: &mut Touch<'a>, _arena: &'a Bump) {
        touch.bsdf = None;
    }

    fn albedo(&self) -> RGB128 {
        self.emission
    }

    fn as_emissive(&self) -> Option<&dyn Emissive> {
        Some(self)
    }
}

impl Emissive for Emitter {
    fn emission(&self) -> RGB128 {
        self.emission
    }

    fn emit(&self, _origin: Vec3f, _outgoing: Vec3f) -> RGB128 {
        self.emission
    }
}
