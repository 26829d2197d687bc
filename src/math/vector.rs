// Small fixed vectors used everywhere in the renderer. Generic so that the
// sampling layer can run in f64 while geometry stays in f32.

use num_traits::{Float, Signed};

use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vec2<T: Copy> {
    pub x: T,
    pub y: T,
}

pub type Vec2f = Vec2<f32>;
pub type Vec2d = Vec2<f64>;
pub type Vec2i = Vec2<i32>;

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Vec3<T: Copy> {
    pub x: T,
    pub y: T,
    pub z: T,
}

pub type Vec3f = Vec3<f32>;
pub type Vec3d = Vec3<f64>;

impl<T: Copy> Vec2<T> {
    pub fn new(x: T, y: T) -> Self {
        Vec2 { x, y }
    }

    pub fn splat(v: T) -> Self {
        Vec2 { x: v, y: v }
    }
}

impl<T: Copy> Vec3<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Vec3 { x, y, z }
    }

    pub fn splat(v: T) -> Self {
        Vec3 { x: v, y: v, z: v }
    }
}

impl<T: Signed + Copy> Vec2<T> {
    pub fn abs(self) -> Self {
        Vec2 {
            x: self.x.abs(),
            y: self.y.abs(),
        }
    }
}

impl<T: Mul<Output = T> + Add<Output = T> + Copy> Vec2<T> {
    pub fn dot(self, o: Vec2<T>) -> T {
        self.x * o.x + self.y * o.y
    }

    pub fn scale(self, s: T) -> Self {
        Vec2 {
            x: self.x * s,
            y: self.y * s,
        }
    }

    pub fn length2(self) -> T {
        self.dot(self)
    }
}

impl<T: Float> Vec2<T> {
    pub fn zero() -> Self {
        Vec2::splat(T::zero())
    }

    pub fn length(self) -> T {
        self.length2().sqrt()
    }

    pub fn normalize(self) -> Self {
        self.scale(T::one() / self.length())
    }

    pub fn floor(self) -> Self {
        Vec2 {
            x: self.x.floor(),
            y: self.y.floor(),
        }
    }
}

impl<T: Signed + Copy> Vec3<T> {
    pub fn abs(self) -> Self {
        Vec3 {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }
}

impl<T: Mul<Output = T> + Add<Output = T> + Copy> Vec3<T> {
    pub fn dot(self, o: Vec3<T>) -> T {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn scale(self, s: T) -> Self {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn length2(self) -> T {
        self.dot(self)
    }
}

impl<T: Mul<Output = T> + Sub<Output = T> + Copy> Vec3<T> {
    pub fn cross(self, o: Vec3<T>) -> Self {
        Vec3 {
            x: self.y * o.z - self.z * o.y,
            y: self.z * o.x - self.x * o.z,
            z: self.x * o.y - self.y * o.x,
        }
    }
}

impl<T: Float> Vec3<T> {
    pub fn zero() -> Self {
        Vec3::splat(T::zero())
    }

    pub fn length(self) -> T {
        self.length2().sqrt()
    }

    pub fn normalize(self) -> Self {
        self.scale(T::one() / self.length())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn min(self, o: Vec3<T>) -> Self {
        Vec3 {
            x: self.x.min(o.x),
            y: self.y.min(o.y),
            z: self.z.min(o.z),
        }
    }

    pub fn max(self, o: Vec3<T>) -> Self {
        Vec3 {
            x: self.x.max(o.x),
            y: self.y.max(o.y),
            z: self.z.max(o.z),
        }
    }

    // Index of the largest component (used when picking a split axis).
    pub fn max_dim(self) -> usize {
        if self.x > self.y {
            if self.x > self.z {
                0
            } else {
                2
            }
        } else if self.y > self.z {
            1
        } else {
            2
        }
    }
}

impl Vec3f {
    pub fn to_f64(self) -> Vec3d {
        Vec3 {
            x: self.x as f64,
            y: self.y as f64,
            z: self.z as f64,
        }
    }
}

impl Vec3d {
    pub fn to_f32(self) -> Vec3f {
        Vec3 {
            x: self.x as f32,
            y: self.y as f32,
            z: self.z as f32,
        }
    }
}

impl Vec2d {
    pub fn to_f32(self) -> Vec2f {
        Vec2 {
            x: self.x as f32,
            y: self.y as f32,
        }
    }
}

impl<T: Add<Output = T> + Copy> Add for Vec2<T> {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        Vec2 {
            x: self.x + o.x,
            y: self.y + o.y,
        }
    }
}

impl<T: Sub<Output = T> + Copy> Sub for Vec2<T> {
    type Output = Self;

    fn sub(self, o: Self) -> Self {
        Vec2 {
            x: self.x - o.x,
            y: self.y - o.y,
        }
    }
}

impl<T: Neg<Output = T> + Copy> Neg for Vec2<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Vec2 {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl<T: Add<Output = T> + Copy> Add for Vec3<T> {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        Vec3 {
            x: self.x + o.x,
            y: self.y + o.y,
            z: self.z + o.z,
        }
    }
}

impl<T: Add<Output = T> + Copy> AddAssign for Vec3<T> {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl<T: Sub<Output = T> + Copy> Sub for Vec3<T> {
    type Output = Self;

    fn sub(self, o: Self) -> Self {
        Vec3 {
            x: self.x - o.x,
            y: self.y - o.y,
            z: self.z - o.z,
        }
    }
}

impl<T: Mul<Output = T> + Copy> Mul for Vec3<T> {
    type Output = Self;

    fn mul(self, o: Self) -> Self {
        Vec3 {
            x: self.x * o.x,
            y: self.y * o.y,
            z: self.z * o.z,
        }
    }
}

impl<T: Div<Output = T> + Copy> Div for Vec3<T> {
    type Output = Self;

    fn div(self, o: Self) -> Self {
        Vec3 {
            x: self.x / o.x,
            y: self.y / o.y,
            z: self.z / o.z,
        }
    }
}

impl<T: Neg<Output = T> + Copy> Neg for Vec3<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Vec3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl<T: Copy> Index<usize> for Vec2<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Index out of range for Vec2"),
        }
    }
}

impl<T: Copy> Index<usize> for Vec3<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Index out of range for Vec3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = Vec3::new(1f32, 0., 0.);
        let y = Vec3::new(0f32, 1., 0.);
        assert_eq!(x.cross(y), Vec3::new(0., 0., 1.));
    }

    #[test]
    fn max_dim_picks_largest_extent() {
        assert_eq!(Vec3::new(1f32, 3., 2.).max_dim(), 1);
        assert_eq!(Vec3::new(5f32, 3., 2.).max_dim(), 0);
        assert_eq!(Vec3::new(1f32, 3., 4.).max_dim(), 2);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let v = Vec3::new(3f64, -4., 12.).normalize();
        assert!((v.length() - 1.).abs() < 1e-12);
    }
}
