use crate::math::ray::Ray;
use crate::math::vector::Vec3f;

use wide::{f32x4, CmpGt, CmpLe};

use std::mem::swap;

/// An axis-aligned box kept as its two extreme corners. The empty box is
/// inverted (`pmin = +inf`, `pmax = -inf`) so that combining is branch-free.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BBox3 {
    pub pmin: Vec3f,
    pub pmax: Vec3f,
}

impl BBox3 {
    pub fn new() -> Self {
        BBox3 {
            pmin: Vec3f::splat(f32::INFINITY),
            pmax: Vec3f::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_pnts(p0: Vec3f, p1: Vec3f) -> Self {
        BBox3 {
            pmin: p0.min(p1),
            pmax: p0.max(p1),
        }
    }

    pub fn combine_pnt(self, p: Vec3f) -> Self {
        BBox3 {
            pmin: self.pmin.min(p),
            pmax: self.pmax.max(p),
        }
    }

    pub fn combine_bnd(self, o: BBox3) -> Self {
        BBox3 {
            pmin: self.pmin.min(o.pmin),
            pmax: self.pmax.max(o.pmax),
        }
    }

    pub fn is_empty(self) -> bool {
        self.pmin.x > self.pmax.x
    }

    pub fn centroid(self) -> Vec3f {
        (self.pmin + self.pmax).scale(0.5)
    }

    pub fn diagonal(self) -> Vec3f {
        self.pmax - self.pmin
    }

    pub fn max_dim(self) -> usize {
        self.diagonal().max_dim()
    }

    pub fn surface_area(self) -> f32 {
        if self.is_empty() {
            return 0.;
        }
        let d = self.diagonal();
        2. * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    // Position of a point relative to the box extents, in [0, 1] per axis.
    pub fn offset(self, p: Vec3f) -> Vec3f {
        let d = self.diagonal();
        Vec3f {
            x: if d.x > 0. { (p.x - self.pmin.x) / d.x } else { 0. },
            y: if d.y > 0. { (p.y - self.pmin.y) / d.y } else { 0. },
            z: if d.z > 0. { (p.z - self.pmin.z) / d.z } else { 0. },
        }
    }

    /// Slab-method entry distance, `f32::INFINITY` on a miss. A ray whose
    /// origin is inside the box reports distance zero.
    pub fn intersect(&self, ray: Ray, inv_dir: Vec3f, max_t: f32) -> f32 {
        let mut t0 = 0f32;
        let mut t1 = max_t;

        for i in 0..3 {
            let mut t_near = (self.pmin[i] - ray.org[i]) * inv_dir[i];
            let mut t_far = (self.pmax[i] - ray.org[i]) * inv_dir[i];
            if t_near > t_far {
                swap(&mut t_near, &mut t_far);
            }

            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };

            if t0 > t1 {
                return f32::INFINITY;
            }
        }

        t0
    }
}

/// Four boxes in structure-of-arrays form so the slab test runs once across
/// all lanes. Absent lanes are filled with the empty box and always miss.
#[derive(Copy, Clone, Debug)]
pub struct BBox3x4 {
    min_x: f32x4,
    min_y: f32x4,
    min_z: f32x4,
    max_x: f32x4,
    max_y: f32x4,
    max_z: f32x4,
}

impl BBox3x4 {
    pub fn new(boxes: [BBox3; 4]) -> Self {
        BBox3x4 {
            min_x: f32x4::from([boxes[0].pmin.x, boxes[1].pmin.x, boxes[2].pmin.x, boxes[3].pmin.x]),
            min_y: f32x4::from([boxes[0].pmin.y, boxes[1].pmin.y, boxes[2].pmin.y, boxes[3].pmin.y]),
            min_z: f32x4::from([boxes[0].pmin.z, boxes[1].pmin.z, boxes[2].pmin.z, boxes[3].pmin.z]),
            max_x: f32x4::from([boxes[0].pmax.x, boxes[1].pmax.x, boxes[2].pmax.x, boxes[3].pmax.x]),
            max_y: f32x4::from([boxes[0].pmax.y, boxes[1].pmax.y, boxes[2].pmax.y, boxes[3].pmax.y]),
            max_z: f32x4::from([boxes[0].pmax.z, boxes[1].pmax.z, boxes[2].pmax.z, boxes[3].pmax.z]),
        }
    }

    /// Entry distances of the four lanes; missing lanes read infinity.
    pub fn intersect4(&self, ray: Ray, inv_dir: Vec3f, max_t: f32) -> [f32; 4] {
        let org_x = f32x4::splat(ray.org.x);
        let org_y = f32x4::splat(ray.org.y);
        let org_z = f32x4::splat(ray.org.z);
        let inv_x = f32x4::splat(inv_dir.x);
        let inv_y = f32x4::splat(inv_dir.y);
        let inv_z = f32x4::splat(inv_dir.z);

        let tx0 = (self.min_x - org_x) * inv_x;
        let tx1 = (self.max_x - org_x) * inv_x;
        let ty0 = (self.min_y - org_y) * inv_y;
        let ty1 = (self.max_y - org_y) * inv_y;
        let tz0 = (self.min_z - org_z) * inv_z;
        let tz1 = (self.max_z - org_z) * inv_z;

        let t_near = tx0.fast_min(tx1).fast_max(ty0.fast_min(ty1)).fast_max(tz0.fast_min(tz1));
        let t_far = tx0.fast_max(tx1).fast_min(ty0.fast_max(ty1)).fast_min(tz0.fast_max(tz1));

        let entry = t_near.fast_max(f32x4::ZERO);
        let hit = entry.cmp_le(t_far) & t_far.cmp_gt(f32x4::ZERO) & entry.cmp_le(f32x4::splat(max_t));
        let entry = hit.blend(entry, f32x4::splat(f32::INFINITY));
        entry.to_array()
    }
}
