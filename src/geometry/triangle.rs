use crate::material::MaterialIndex;
use crate::math::bbox::BBox3;
use crate::math::ray::Ray;
use crate::math::sampling::uniform_sample_triangle;
use crate::math::vector::{Vec2d, Vec2f, Vec3f};

/// A triangle frozen for intersection: one vertex and the two edges leaving
/// it, with per-vertex shading data. Shading normals are unit length, or
/// all zero for flat triangles.
#[derive(Clone, Debug)]
pub struct PreparedTriangle {
    pub vertex0: Vec3f,
    pub edge1: Vec3f,
    pub edge2: Vec3f,

    pub normals: [Vec3f; 3],
    pub uvs: [Vec2f; 3],

    pub material: MaterialIndex,
}

impl PreparedTriangle {
    pub fn new(vertices: [Vec3f; 3], material: MaterialIndex) -> Self {
        PreparedTriangle {
            vertex0: vertices[0],
            edge1: vertices[1] - vertices[0],
            edge2: vertices[2] - vertices[0],
            normals: [Vec3f::zero(); 3],
            uvs: [
                Vec2f::new(0., 0.),
                Vec2f::new(1., 0.),
                Vec2f::new(0., 1.),
            ],
            material,
        }
    }

    pub fn with_shading(
        vertices: [Vec3f; 3],
        normals: [Vec3f; 3],
        uvs: [Vec2f; 3],
        material: MaterialIndex,
    ) -> Self {
        let mut triangle = Self::new(vertices, material);
        triangle.normals = normals.map(|n| n.normalize());
        triangle.uvs = uvs;
        triangle
    }

    pub fn area(&self) -> f32 {
        self.edge1.cross(self.edge2).length() / 2.
    }

    pub fn bounds(&self) -> BBox3 {
        BBox3::new()
            .combine_pnt(self.vertex0)
            .combine_pnt(self.vertex0 + self.edge1)
            .combine_pnt(self.vertex0 + self.edge2)
    }

    /// Face normal from the winding order.
    pub fn flat_normal(&self) -> Vec3f {
        self.edge1.cross(self.edge2).normalize()
    }

    /// Möller-Trumbore intersection: distance and barycentric uv, or
    /// infinity when the ray is parallel, outside the edges, or behind.
    pub fn intersect(&self, ray: Ray) -> (f32, Vec2f) {
        const MISS: (f32, Vec2f) = (f32::INFINITY, Vec2f { x: 0., y: 0. });

        let pvec = ray.dir.cross(self.edge2);
        let det = self.edge1.dot(pvec);
        if det == 0. {
            return MISS;
        }
        let inv_det = 1. / det;

        let tvec = ray.org - self.vertex0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0. ..=1.).contains(&u) {
            return MISS;
        }

        let qvec = tvec.cross(self.edge1);
        let v = ray.dir.dot(qvec) * inv_det;
        if v < 0. || u + v > 1. {
            return MISS;
        }

        let t = self.edge2.dot(qvec) * inv_det;
        if t < 0. {
            return MISS;
        }

        (t, Vec2f::new(u, v))
    }

    /// Occlusion variant: the same rejection branches, but scaled by the
    /// determinant so no division happens, and an early exit once the
    /// distance is known to be inside `travel`.
    pub fn intersect_occlude(&self, ray: Ray, travel: f32) -> bool {
        let pvec = ray.dir.cross(self.edge2);
        let det = self.edge1.dot(pvec);
        if det == 0. {
            return false;
        }

        let tvec = ray.org - self.vertex0;
        let qvec = tvec.cross(self.edge1);

        let u = tvec.dot(pvec);
        let v = ray.dir.dot(qvec);
        let t = self.edge2.dot(qvec);

        if det > 0. {
            u >= 0. && u <= det && v >= 0. && u + v <= det && t >= 0. && t < travel * det
        } else {
            u <= 0. && u >= det && v <= 0. && u + v >= det && t <= 0. && t > travel * det
        }
    }

    /// Shading normal at barycentric `uv`; flat triangles use the face
    /// normal.
    pub fn normal_at(&self, uv: Vec2f) -> Vec3f {
        let interpolated = self.normals[0].scale(1. - uv.x - uv.y)
            + self.normals[1].scale(uv.x)
            + self.normals[2].scale(uv.y);
        if interpolated.length2() == 0. {
            self.flat_normal()
        } else {
            interpolated.normalize()
        }
    }

    pub fn texcoord_at(&self, uv: Vec2f) -> Vec2f {
        self.uvs[0].scale(1. - uv.x - uv.y) + self.uvs[1].scale(uv.x) + self.uvs[2].scale(uv.y)
    }

    pub fn point_at(&self, uv: Vec2f) -> Vec3f {
        self.vertex0 + self.edge1.scale(uv.x) + self.edge2.scale(uv.y)
    }

    /// Uniform point on the surface for direct-illumination sampling.
    pub fn sample(&self, u: Vec2d) -> (Vec3f, Vec3f) {
        let b = uniform_sample_triangle(u).to_f32();
        let point = self.point_at(b);
        (point, self.flat_normal())
    }

    /// Solid-angle density of picking `point` (with surface normal
    /// `normal`) as seen from `origin`.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vector::{Vec2, Vec3};

    fn unit_triangle() -> PreparedTriangle {
        PreparedTriangle::new(
            [
                Vec3::new(0., 0., 0.),
                Vec3::new(1., 0., 0.),
                Vec3::new(0., 1., 0.),
            ],
            MaterialIndex(0),
        )
    }

    #[test]
    fn hits_interior_with_barycentric_uv() {
        let triangle = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.), Vec3::new(0., 0., -1.));
        let (t, uv) = triangle.intersect(ray);
        assert!((t - 1.).abs() < 1e-6);
        assert!((uv.x - 0.25).abs() < 1e-6);
        assert!((uv.y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn parallel_ray_misses() {
        let triangle = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.), Vec3::new(1., 0., 0.));
        let (t, _) = triangle.intersect(ray);
        assert!(t.is_infinite());
    }

    #[test]
    fn behind_and_outside_miss() {
        let triangle = unit_triangle();
        let behind = Ray::new(Vec3::new(0.25, 0.25, -1.), Vec3::new(0., 0., -1.));
        assert!(triangle.intersect(behind).0.is_infinite());

        let outside = Ray::new(Vec3::new(0.9, 0.9, 1.), Vec3::new(0., 0., -1.));
        assert!(triangle.intersect(outside).0.is_infinite());
    }

    #[test]
    fn occlude_agrees_with_intersect() {
        let triangle = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.), Vec3::new(0., 0., -1.));
        assert!(triangle.intersect_occlude(ray, 2.));
        // The hit at t = 1 is outside a shorter travel bound.
        assert!(!triangle.intersect_occlude(ray, 0.5));

        // Flipped winding exercises the negative-determinant branch.
        let flipped = PreparedTriangle::new(
            [
                Vec3::new(0., 0., 0.),
                Vec3::new(0., 1., 0.),
                Vec3::new(1., 0., 0.),
            ],
            MaterialIndex(0),
        );
        assert!(flipped.intersect_occlude(ray, 2.));
    }

    #[test]
    fn area_of_unit_right_triangle() {
        assert!((unit_triangle().area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn flat_triangle_uses_face_normal() {
        let triangle = unit_triangle();
        let n = triangle.normal_at(Vec2::new(0.3, 0.3));
        assert!((n - Vec3::new(0., 0., 1.)).length() < 1e-6);
    }

    #[test]
    fn interpolated_normals_blend() {
        let triangle = PreparedTriangle::with_shading(
            [
                Vec3::new(0., 0., 0.),
                Vec3::new(1., 0., 0.),
                Vec3::new(0., 1., 0.),
            ],
            [
                Vec3::new(0., 0., 1.),
                Vec3::new(1., 0., 1.).normalize(),
                Vec3::new(0., 1., 1.).normalize(),
            ],
            [Vec2::zero(), Vec2::new(1., 0.), Vec2::new(0., 1.)],
            MaterialIndex(0),
        );

        let center = triangle.normal_at(Vec2::new(1. / 3., 1. / 3.));
        assert!((center.length() - 1.).abs() < 1e-6);
        assert!(center.x > 0. && center.y > 0. && center.z > 0.);
    }

    #[test]
    fn samples_cover_the_surface_uniformly() {
        let triangle = unit_triangle();
        let mut rng = crate::math::random::RandGen::new(7);
        for _ in 0..256 {
            let (p, n) = triangle.sample(rng.uniform_vec2());
            assert!(p.x >= 0. && p.y >= 0. && p.x + p.y <= 1. + 1e-6);
            assert_eq!(p.z, 0.);
            let pdf = triangle.pdf_from(Vec3::new(0., 0., 2.), p, n);
            assert!(pdf > 0.);
        }
    }
}
