// Mutable ray-query state threaded through the accelerator hierarchy. The
// ray inside a query is rewritten as instances transform it into their
// local spaces and restored on the way out; `current` always names the
// instance path being traversed.

use crate::math::ray::Ray;
use crate::math::vector::{Vec2f, Vec3f};
use crate::scene::token::TokenHierarchy;

/// Nearest-hit query. `distance` enters as the upper bound and leaves as
/// the hit distance; `token` is the full hierarchy of the hit or empty on
/// a miss.
#[derive(Clone, Debug)]
pub struct TraceQuery {
    pub ray: Ray,
    pub distance: f32,
    pub uv: Vec2f,
    pub ignore: TokenHierarchy,
    pub current: TokenHierarchy,
    pub token: TokenHierarchy,
}

impl TraceQuery {
    // How far spawned rays start from their source surface.
    const SPAWN_OFFSET: f32 = 1e-4;

    pub fn new(ray: Ray) -> Self {
        Self::with_bound(ray, f32::INFINITY)
    }

    pub fn with_bound(ray: Ray, distance: f32) -> Self {
        TraceQuery {
            ray,
            distance,
            uv: Vec2f::zero(),
            ignore: TokenHierarchy::new(),
            current: TokenHierarchy::new(),
            token: TokenHierarchy::new(),
        }
    }

    pub fn hit(&self) -> bool {
        !self.token.is_empty()
    }

    /// Continuation query for the next path segment. The hit just recorded
    /// becomes the ignored entity so the bounce cannot re-hit its origin;
    /// the origin is also nudged forward so float noise cannot pin the new
    /// ray to the spawning surface.
    pub fn spawn_trace(&self, point: Vec3f, direction: Vec3f) -> TraceQuery {
        let direction = direction.normalize();
        let origin = point + direction.scale(Self::SPAWN_OFFSET);
        let mut next = TraceQuery::new(Ray { org: origin, dir: direction });
        next.ignore = self.token.clone();
        next
    }
}

/// Any-hit query: something closer than `travel`?
#[derive(Clone, Debug)]
pub struct OccludeQuery {
    pub ray: Ray,
    pub travel: f32,
    pub ignore: TokenHierarchy,
    pub current: TokenHierarchy,
}

impl OccludeQuery {
    pub fn new(ray: Ray, travel: f32) -> Self {
        OccludeQuery {
            ray,
            travel,
            ignore: TokenHierarchy::new(),
            current: TokenHierarchy::new(),
        }
    }

    pub fn with_ignore(ray: Ray, travel: f32, ignore: TokenHierarchy) -> Self {
        OccludeQuery {
            ray,
            travel,
            ignore,
            current: TokenHierarchy::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vector::Vec3;
    use crate::scene::token::{EntityToken, TokenKind};

    #[test]
    fn spawned_query_ignores_its_origin() {
        let ray = Ray::new(Vec3::zero(), Vec3::new(0., 0., 1.));
        let mut query = TraceQuery::new(ray);
        assert!(!query.hit());

        query.token =
            TokenHierarchy::extended(&query.current, EntityToken::new(TokenKind::Triangle, 3));
        assert!(query.hit());

        let next = query.spawn_trace(Vec3::new(0., 0., 1.), Vec3::new(0., 1., 0.));
        assert_eq!(next.ignore, query.token);
        assert!(next.token.is_empty());
        assert_eq!(next.distance, f32::INFINITY);
    }
}
