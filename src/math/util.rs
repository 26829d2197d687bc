use crate::math::vector::Vec3;

use num_traits::Float;

// Builds an orthonormal basis around a single (unit) vector.
pub fn coord_system<T: Float>(v1: Vec3<T>) -> (Vec3<T>, Vec3<T>) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        Vec3 {
            x: -v1.z,
            y: T::zero(),
            z: v1.x,
        }
    } else {
        Vec3 {
            x: T::zero(),
            y: v1.z,
            z: -v1.y,
        }
    }
    .normalize();

    (v2, v1.cross(v2))
}

// Flips vec if needed so it lies in the same hemisphere as refv.
pub fn align<T: Float>(refv: Vec3<T>, vec: Vec3<T>) -> Vec3<T> {
    if refv.dot(vec) < T::zero() {
        -vec
    } else {
        vec
    }
}

// Mirror reflection of wo about a unit normal.
pub fn reflect<T: Float>(wo: Vec3<T>, n: Vec3<T>) -> Vec3<T> {
    -wo + n.scale((T::one() + T::one()) * wo.dot(n))
}

// Refraction of wi about a unit normal with relative index eta = eta_i/eta_t.
// None on total internal reflection.
pub fn refract<T: Float>(wi: Vec3<T>, n: Vec3<T>, eta: T) -> Option<Vec3<T>> {
    let cos_theta_i = n.dot(wi);
    let sin2_theta_i = T::zero().max(T::one() - cos_theta_i * cos_theta_i);
    let sin2_theta_t = eta * eta * sin2_theta_i;

    if sin2_theta_t >= T::one() {
        return None;
    }

    let cos_theta_t = (T::one() - sin2_theta_t).sqrt();
    Some(-wi.scale(eta) + n.scale(eta * cos_theta_i - cos_theta_t))
}

// Solves the quadratic robustly (Horner-form discriminant, catastrophic
// cancellation avoided by picking the stable root first).
pub fn quadratic<T: Float>(a: T, b: T, c: T) -> Option<(T, T)> {
    let four = T::from(4).unwrap();
    let half = T::from(0.5).unwrap();

    let disc = b.mul_add(b, -four * a * c);
    if disc < T::zero() {
        return None;
    }
    let root_disc = disc.sqrt();

    let q = if b < T::zero() {
        -half * (b - root_disc)
    } else {
        -half * (b + root_disc)
    };

    let t0 = q / a;
    let t1 = c / q;

    Some((t0.min(t1), t0.max(t1)))
}

pub fn lerp<T: Float>(a: T, b: T, t: T) -> T {
    a * (T::one() - t) + b * t
}
