pub mod query;
pub mod token;

use crate::material::Material;
use crate::math::matrix::Mat4;
use crate::math::vector::{Vec2f, Vec3f};

use std::sync::Arc;

/// Index into a scene's material list, assigned when the material is added.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MaterialRef(pub usize);

/// The mutable authoring tree. Nothing here is consulted during rendering;
/// preparation freezes a `Scene` into the immutable prepared form and the
/// authoring side is free afterwards.
#[derive(Default)]
pub struct Scene {
    materials: Vec<Arc<dyn Material>>,
    entities: Vec<Entity>,
}

pub enum Entity {
    Triangle {
        vertices: [Vec3f; 3],
        /// Shading normals; `None` renders flat.
        normals: Option<[Vec3f; 3]>,
        uvs: Option<[Vec2f; 3]>,
        material: MaterialRef,
    },
    Sphere {
        center: Vec3f,
        radius: f32,
        material: MaterialRef,
    },
    /// A nested scene placed under an affine, uniformly scaling transform.
    /// The same `Arc` may appear many times; preparation shares the frozen
    /// pack between occurrences.
    Instance { scene: Arc<Scene>, transform: Mat4 },
}

impl Scene {
    pub fn new() -> Self {
        Scene::default()
    }

    pub fn add_material(&mut self, material: Arc<dyn Material>) -> MaterialRef {
        self.materials.push(material);
        MaterialRef(self.materials.len() - 1)
    }

    pub fn add_triangle(&mut self, vertices: [Vec3f; 3], material: MaterialRef) {
        self.entities.push(Entity::Triangle {
            vertices,
            normals: None,
            uvs: None,
            material,
        });
    }

    pub fn add_triangle_full(
        &mut self,
        vertices: [Vec3f; 3],
        normals: [Vec3f; 3],
        uvs: [Vec2f; 3],
        material: MaterialRef,
    ) {
        self.entities.push(Entity::Triangle {
            vertices,
            normals: Some(normals),
            uvs: Some(uvs),
            material,
        });
    }

    pub fn add_sphere(&mut self, center: Vec3f, radius: f32, material: MaterialRef) {
        self.entities.push(Entity::Sphere {
            center,
            radius,
            material,
        });
    }

    pub fn add_instance(&mut self, scene: Arc<Scene>, transform: Mat4) {
        self.entities.push(Entity::Instance { scene, transform });
    }

    pub fn materials(&self) -> &[Arc<dyn Material>] {
        &self.materials
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}
