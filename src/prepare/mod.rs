pub mod instance;
pub mod pack;
pub mod power;
pub mod swatch;

use crate::accelerator::{self, AcceleratorProfile, TokenBound};
use crate::geometry::{PreparedSphere, PreparedTriangle};
use crate::material::{Material, Touch};
use crate::math::matrix::Mat4;
use crate::math::ray::Ray;
use crate::prepare::instance::PreparedInstance;
use crate::prepare::pack::PreparedPack;
use crate::prepare::power::{PowerDistribution, PowerSegment};
use crate::prepare::swatch::{PreparedSwatch, SwatchExtractor};
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::{EntityToken, TokenHierarchy, TokenKind};
use crate::scene::{Entity, MaterialRef, Scene};

use log::info;
use thiserror::Error;

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Error, Debug)]
pub enum PreparationError {
    #[error("instance transform scales non-uniformly: rows {scales:?}")]
    NonUniformScale { scales: (f32, f32, f32) },

    #[error("instance transform is singular")]
    SingularTransform,

    #[error("material reference {0} is out of range")]
    UnknownMaterial(usize),

    #[error("emissive triangle has zero area")]
    ZeroAreaEmitter,

    #[error("scene instances itself, directly or transitively")]
    CyclicInstance,

    #[error("instances nest deeper than {limit}")]
    InstanceDepthExceeded { limit: usize },
}

/// Freezes an authoring scene into its query-optimized form. The returned
/// scene is immutable and may be shared freely between worker threads.
pub fn prepare(
    scene: &Arc<Scene>,
    profile: &AcceleratorProfile,
) -> Result<PreparedScene, PreparationError> {
    let mut preparer = Preparer {
        profile: *profile,
        cache: HashMap::new(),
        in_progress: Vec::new(),
    };

    let (pack, power) = preparer.prepare_pack(scene)?;
    if pack.depth() > TokenHierarchy::MAX_DEPTH {
        return Err(PreparationError::InstanceDepthExceeded {
            limit: TokenHierarchy::MAX_DEPTH,
        });
    }

    let swatch = pack.swatch().clone();
    let root = PreparedInstance::new(pack, swatch, Mat4::identity(), power)?;

    info!(
        "prepared scene: {:?}, nesting depth {}, radiant power {:.3}",
        root.pack().counts(),
        root.pack().depth(),
        root.power(),
    );

    Ok(PreparedScene { root })
}

// Scene pointers key the dedup cache; two instances of the same authoring
// scene share one frozen pack.
type SceneKey = usize;

struct Preparer {
    profile: AcceleratorProfile,
    cache: HashMap<SceneKey, (Arc<PreparedPack>, Option<Arc<PowerDistribution>>)>,
    // DFS coloring for cycle detection: scenes currently being frozen.
    in_progress: Vec<SceneKey>,
}

impl Preparer {
    fn prepare_pack(
        &mut self,
        scene: &Arc<Scene>,
    ) -> Result<(Arc<PreparedPack>, Option<Arc<PowerDistribution>>), PreparationError> {
        let key = Arc::as_ptr(scene) as SceneKey;
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        if self.in_progress.contains(&key) {
            return Err(PreparationError::CyclicInstance);
        }
        self.in_progress.push(key);

        let result = self.freeze(scene);

        self.in_progress.pop();
        let frozen = result?;
        self.cache.insert(key, frozen.clone());
        Ok(frozen)
    }

    fn freeze(
        &mut self,
        scene: &Arc<Scene>,
    ) -> Result<(Arc<PreparedPack>, Option<Arc<PowerDistribution>>), PreparationError> {
        let mut extractor = SwatchExtractor::new();
        let mut triangles = Vec::new();
        let mut spheres = Vec::new();
        let mut instances = Vec::new();

        for entity in scene.entities() {
            match entity {
                Entity::Triangle {
                    vertices,
                    normals,
                    uvs,
                    material,
                } => {
                    let material = material_of(scene, *material)?;
                    let index = extractor.register(material);
                    let triangle = match (normals, uvs) {
                        (Some(normals), Some(uvs)) => {
                            PreparedTriangle::with_shading(*vertices, *normals, *uvs, index)
                        }
                        _ => PreparedTriangle::new(*vertices, index),
                    };
                    if material.is_emissive() && triangle.area() == 0. {
                        return Err(PreparationError::ZeroAreaEmitter);
                    }
                    triangles.push(triangle);
                }
                Entity::Sphere {
                    center,
                    radius,
                    material,
                } => {
                    let material = material_of(scene, *material)?;
                    let index = extractor.register(material);
                    spheres.push(PreparedSphere::new(*center, *radius, index));
                }
                Entity::Instance {
                    scene: child,
                    transform,
                } => {
                    let (pack, power) = self.prepare_pack(child)?;
                    let swatch = pack.swatch().clone();
                    instances.push(PreparedInstance::new(pack, swatch, *transform, power)?);
                }
            }
        }

        let swatch = Arc::new(extractor.finish());

        // Token-bound pairs feed the accelerator builder in array order so
        // token indices line up with the primitive arrays.
        let mut pairs: Vec<TokenBound> = Vec::with_capacity(
            triangles.len() + spheres.len() + instances.len(),
        );
        for (i, triangle) in triangles.iter().enumerate() {
            pairs.push((EntityToken::new(TokenKind::Triangle, i), triangle.bounds()));
        }
        for (i, sphere) in spheres.iter().enumerate() {
            pairs.push((EntityToken::new(TokenKind::Sphere, i), sphere.bounds()));
        }
        for (i, instance) in instances.iter().enumerate() {
            pairs.push((EntityToken::new(TokenKind::Instance, i), instance.bounds()));
        }

        let power = build_power(&triangles, &spheres, &instances, &swatch);

        let counts = crate::geometry::GeometryCounts {
            triangles: triangles.len(),
            spheres: spheres.len(),
            instances: instances.len(),
        };
        let kind = self.profile.select(counts);
        let accelerator = accelerator::build(kind, pairs);

        let pack = Arc::new(PreparedPack::assemble(
            triangles,
            spheres,
            instances,
            accelerator,
            swatch,
        ));
        Ok((pack, power.map(Arc::new)))
    }
}

fn material_of(
    scene: &Scene,
    reference: MaterialRef,
) -> Result<&Arc<dyn Material>, PreparationError> {
    scene
        .materials()
        .get(reference.0)
        .ok_or(PreparationError::UnknownMaterial(reference.0))
}

// One segment per emissive material over its geometry, plus one for the
// radiating nested instances. Absent entirely when nothing glows.
fn build_power(
    triangles: &[PreparedTriangle],
    spheres: &[PreparedSphere],
    instances: &[PreparedInstance],
    swatch: &PreparedSwatch,
) -> Option<PowerDistribution> {
    let mut segments = Vec::new();

    for &material in swatch.emissive_indices() {
        let power = swatch
            .material(material)
            .as_emissive()
            .map(|e| e.power() as f64)
            .unwrap_or(0.);

        let mut segment = PowerSegment {
            tokens: Vec::new(),
            weights: Vec::new(),
        };
        for (i, triangle) in triangles.iter().enumerate() {
            if triangle.material == material {
                segment.tokens.push(EntityToken::new(TokenKind::Triangle, i));
                segment.weights.push(triangle.area() as f64 * power);
            }
        }
        for (i, sphere) in spheres.iter().enumerate() {
            if sphere.material == material {
                segment.tokens.push(EntityToken::new(TokenKind::Sphere, i));
                segment.weights.push(sphere.area() as f64 * power);
            }
        }
        if !segment.tokens.is_empty() {
            segments.push(segment);
        }
    }

    let mut instance_segment = PowerSegment {
        tokens: Vec::new(),
        weights: Vec::new(),
    };
    for (i, instance) in instances.iter().enumerate() {
        let power = instance.power();
        if power > 0. {
            instance_segment
                .tokens
                .push(EntityToken::new(TokenKind::Instance, i));
            instance_segment.weights.push(power);
        }
    }
    if !instance_segment.tokens.is_empty() {
        segments.push(instance_segment);
    }

    PowerDistribution::new(segments)
}

/// The frozen scene: a root instance under the identity transform. All
/// queries enter world space here.
pub struct PreparedScene {
    root: PreparedInstance,
}

impl PreparedScene {
    pub fn root(&self) -> &PreparedInstance {
        &self.root
    }

    /// Nearest hit; true when the query now records one.
    pub fn trace(&self, query: &mut TraceQuery) -> bool {
        self.root.pack().trace(query);
        query.hit()
    }

    pub fn occlude(&self, query: &mut OccludeQuery) -> bool {
        self.root.pack().occlude(query)
    }

    pub fn trace_cost(&self, ray: Ray, distance: &mut f32) -> u32 {
        self.root.pack().trace_cost(ray, distance)
    }

    /// Resolves a completed trace into the world-space surface contact:
    /// walks the recorded instance chain to accumulate transforms, then
    /// reads normals and texture coordinates off the leaf primitive.
    pub fn interact(&self, query: &TraceQuery) -> Touch<'_> {
        debug_assert!(query.hit());

        let mut pack = self.root.pack();
        let mut swatch = self.root.swatch();
        let mut local_from_world = Mat4::identity();
        let mut world_from_local = Mat4::identity();

        let tokens = query.token.tokens();
        for token in &tokens[..tokens.len() - 1] {
            debug_assert_eq!(token.kind(), TokenKind::Instance);
            let instance = &pack.instances()[token.index()];
            local_from_world = instance.forward().mul(local_from_world);
            world_from_local = world_from_local.mul(instance.inverse());
            swatch = instance.swatch();
            pack = instance.pack();
        }

        let leaf = *tokens.last().unwrap();
        let point = query.ray.point_at(query.distance);
        let outgoing = -query.ray.dir;

        let (normal, shading_normal, uv, material) = match leaf.kind() {
            TokenKind::Triangle => {
                let triangle = &pack.triangles()[leaf.index()];
                let normal = world_from_local
                    .mul_vector(triangle.flat_normal())
                    .normalize();
                let shading = world_from_local
                    .mul_vector(triangle.normal_at(query.uv))
                    .normalize();
                (
                    normal,
                    shading,
                    triangle.texcoord_at(query.uv),
                    triangle.material,
                )
            }
            TokenKind::Sphere => {
                let sphere = &pack.spheres()[leaf.index()];
                let local_point = local_from_world.mul_point(point);
                let normal = world_from_local
                    .mul_vector(sphere.normal_at(local_point))
                    .normalize();
                (
                    normal,
                    normal,
                    sphere.texcoord_at(local_point),
                    sphere.material,
                )
            }
            _ => unreachable!("hierarchy leaves are primitives"),
        };

        Touch {
            point,
            normal,
            shading_normal,
            outgoing,
            uv,
            material: swatch.material(material),
            bsdf: None,
        }
    }
}
