use crate::math::ray::Ray;
use crate::math::vector::{Vec2f, Vec3f};

/// Pinhole camera. Film coordinates are centered: `uv.x` spans
/// `[-0.5, 0.5]` across the width, `uv.y` is pre-divided by the aspect
/// ratio so pixels stay square.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    position: Vec3f,
    forward: Vec3f,
    right: Vec3f,
    up: Vec3f,
    // Distance from the pinhole to a unit-wide film plane.
    film_distance: f32,
}

impl PerspectiveCamera {
    pub fn new(position: Vec3f, look_at: Vec3f, up_hint: Vec3f, field_of_view: f32) -> Self {
        let forward = (look_at - position).normalize();
        let right = forward.cross(up_hint).normalize();
        let up = right.cross(forward);

        PerspectiveCamera {
            position,
            forward,
            right,
            up,
            film_distance: 0.5 / (field_of_view.to_radians() / 2.).tan(),
        }
    }

    pub fn position(&self) -> Vec3f {
        self.position
    }

    pub fn spawn_ray(&self, uv: Vec2f) -> Ray {
        let direction = self.forward.scale(self.film_distance)
            + self.right.scale(uv.x)
            + self.up.scale(uv.y);
        Ray::new(self.position, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vector::{Vec2, Vec3};

    #[test]
    fn center_ray_looks_forward() {
        let camera = PerspectiveCamera::new(
            Vec3::new(0., 0., -3.),
            Vec3::zero(),
            Vec3::new(0., 1., 0.),
            60.,
        );
        let ray = camera.spawn_ray(Vec2::zero());
        assert!((ray.dir - Vec3::new(0., 0., 1.)).length() < 1e-6);
        assert_eq!(ray.org, Vec3::new(0., 0., -3.));
    }

    #[test]
    fn film_edge_matches_field_of_view() {
        let camera = PerspectiveCamera::new(
            Vec3::zero(),
            Vec3::new(0., 0., 1.),
            Vec3::new(0., 1., 0.),
            90.,
        );
        // At 90 degrees the film half-width equals the film distance.
        let edge = camera.spawn_ray(Vec2::new(0.5, 0.));
        let angle = edge.dir.dot(Vec3::new(0., 0., 1.)).acos();
        assert!((angle.to_degrees() - 45.).abs() < 1e-3);
    }
}
