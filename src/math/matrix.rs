use crate::math::bbox::BBox3;
use crate::math::vector::Vec3f;

/// Row-major 4x4 matrix restricted to affine use (last row `0 0 0 1`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Mat4 {
    pub fn identity() -> Self {
        Mat4 {
            m: [
                [1., 0., 0., 0.],
                [0., 1., 0., 0.],
                [0., 0., 1., 0.],
                [0., 0., 0., 1.],
            ],
        }
    }

    pub fn translate(t: Vec3f) -> Self {
        Mat4 {
            m: [
                [1., 0., 0., t.x],
                [0., 1., 0., t.y],
                [0., 0., 1., t.z],
                [0., 0., 0., 1.],
            ],
        }
    }

    pub fn scale(s: f32) -> Self {
        Mat4 {
            m: [
                [s, 0., 0., 0.],
                [0., s, 0., 0.],
                [0., 0., s, 0.],
                [0., 0., 0., 1.],
            ],
        }
    }

    pub fn rotate(deg: f32, axis: Vec3f) -> Self {
        let a = axis.normalize();
        let (sin, cos) = deg.to_radians().sin_cos();
        let ic = 1. - cos;
        Mat4 {
            m: [
                [
                    a.x * a.x * ic + cos,
                    a.x * a.y * ic - a.z * sin,
                    a.x * a.z * ic + a.y * sin,
                    0.,
                ],
                [
                    a.y * a.x * ic + a.z * sin,
                    a.y * a.y * ic + cos,
                    a.y * a.z * ic - a.x * sin,
                    0.,
                ],
                [
                    a.z * a.x * ic - a.y * sin,
                    a.z * a.y * ic + a.x * sin,
                    a.z * a.z * ic + cos,
                    0.,
                ],
                [0., 0., 0., 1.],
            ],
        }
    }

    pub fn mul(self, o: Mat4) -> Self {
        let mut r = [[0f32; 4]; 4];
        for (i, row) in r.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.m[i][k] * o.m[k][j]).sum();
            }
        }
        Mat4 { m: r }
    }

    pub fn mul_point(self, p: Vec3f) -> Vec3f {
        Vec3f {
            x: self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2] * p.z + self.m[0][3],
            y: self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2] * p.z + self.m[1][3],
            z: self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2] * p.z + self.m[2][3],
        }
    }

    pub fn mul_vector(self, v: Vec3f) -> Vec3f {
        Vec3f {
            x: self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            y: self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            z: self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        }
    }

    /// Magnitudes of the three linear rows. Equal magnitudes mean the
    /// transform scales uniformly.
    pub fn row_scales(self) -> Vec3f {
        let row = |i: usize| {
            Vec3f::new(self.m[i][0], self.m[i][1], self.m[i][2]).length()
        };
        Vec3f::new(row(0), row(1), row(2))
    }

    /// Inverse of an affine transform: transpose-adjugate of the linear
    /// block, translation back-substituted. Returns `None` if singular.
    pub fn inverse(self) -> Option<Mat4> {
        let a = self.m;
        let det = a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
            - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0]);
        if det == 0. || !det.is_finite() {
            return None;
        }
        let inv_det = 1. / det;

        let mut r = [[0f32; 4]; 4];
        r[0][0] = (a[1][1] * a[2][2] - a[1][2] * a[2][1]) * inv_det;
        r[0][1] = (a[0][2] * a[2][1] - a[0][1] * a[2][2]) * inv_det;
        r[0][2] = (a[0][1] * a[1][2] - a[0][2] * a[1][1]) * inv_det;
        r[1][0] = (a[1][2] * a[2][0] - a[1][0] * a[2][2]) * inv_det;
        r[1][1] = (a[0][0] * a[2][2] - a[0][2] * a[2][0]) * inv_det;
        r[1][2] = (a[0][2] * a[1][0] - a[0][0] * a[1][2]) * inv_det;
        r[2][0] = (a[1][0] * a[2][1] - a[1][1] * a[2][0]) * inv_det;
        r[2][1] = (a[0][1] * a[2][0] - a[0][0] * a[2][1]) * inv_det;
        r[2][2] = (a[0][0] * a[1][1] - a[0][1] * a[1][0]) * inv_det;

        // Translation: -R_inv * t
        let t = Vec3f::new(a[0][3], a[1][3], a[2][3]);
        r[0][3] = -(r[0][0] * t.x + r[0][1] * t.y + r[0][2] * t.z);
        r[1][3] = -(r[1][0] * t.x + r[1][1] * t.y + r[1][2] * t.z);
        r[2][3] = -(r[2][0] * t.x + r[2][1] * t.y + r[2][2] * t.z);
        r[3][3] = 1.;

        Some(Mat4 { m: r })
    }

    /// Conservative bound of a transformed box: the hull of its eight
    /// transformed corners.
    pub fn transform_bound(self, b: BBox3) -> BBox3 {
        if b.is_empty() {
            return b;
        }
        let mut r = BBox3::new();
        for i in 0..8 {
            let corner = Vec3f {
                x: if i & 1 != 0 { b.pmax.x } else { b.pmin.x },
                y: if i & 2 != 0 { b.pmax.y } else { b.pmin.y },
                z: if i & 4 != 0 { b.pmax.z } else { b.pmin.z },
            };
            r = r.combine_pnt(self.mul_point(corner));
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vector::Vec3;

    #[test]
    fn inverse_round_trips_points() {
        let t = Mat4::translate(Vec3::new(1., 2., 3.))
            .mul(Mat4::rotate(30., Vec3::new(0., 1., 0.)))
            .mul(Mat4::scale(0.5));
        let inv = t.inverse().unwrap();
        let p = Vec3::new(0.3, -1.2, 4.5);
        let q = inv.mul_point(t.mul_point(p));
        assert!((q - p).length() < 1e-5);
    }

    #[test]
    fn row_scales_detect_uniformity() {
        let s = Mat4::scale(2.).mul(Mat4::rotate(45., Vec3::new(1., 1., 0.)));
        let rows = s.row_scales();
        assert!((rows.x - 2.).abs() < 1e-5);
        assert!((rows.y - 2.).abs() < 1e-5);
        assert!((rows.z - 2.).abs() < 1e-5);
    }

    #[test]
    fn transform_bound_contains_all_corners() {
        let b = BBox3::from_pnts(Vec3::splat(-1.), Vec3::splat(1.));
        let m = Mat4::rotate(45., Vec3::new(0., 0., 1.));
        let tb = m.transform_bound(b);
        let expect = 2f32.sqrt();
        assert!((tb.pmax.x - expect).abs() < 1e-5);
        assert!((tb.pmin.x + expect).abs() < 1e-5);
    }
}
