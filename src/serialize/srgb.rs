// The sRGB transfer pair used by the legacy 8-bit image path, plus the
// packed byte layouts those formats expect.

use crate::color::RGBA128;

const THRESHOLD: f32 = 0.0031308;
const LINEAR_SLOPE: f32 = 12.92;
const POWER: f32 = 2.4;
const OFFSET: f32 = 0.055;

/// Linear radiance to gamma-encoded sRGB in `[0, 1]`.
pub fn forward(linear: f32) -> f32 {
    if linear <= THRESHOLD {
        linear * LINEAR_SLOPE
    } else {
        (1. + OFFSET) * linear.powf(1. / POWER) - OFFSET
    }
}

/// Gamma-encoded sRGB back to linear radiance.
pub fn inverse(encoded: f32) -> f32 {
    if encoded <= THRESHOLD * LINEAR_SLOPE {
        encoded / LINEAR_SLOPE
    } else {
        ((encoded + OFFSET) / (1. + OFFSET)).powf(POWER)
    }
}

fn to_byte(channel: f32) -> u8 {
    (forward(channel.clamp(0., 1.)) * 255. + 0.5) as u8
}

fn from_byte(byte: u8) -> f32 {
    inverse(byte as f32 / 255.)
}

/// 32-bpp layout: blue, green, red, alpha. Alpha stays linear.
pub fn pack_bgra8(color: RGBA128) -> [u8; 4] {
    [
        to_byte(color.b),
        to_byte(color.g),
        to_byte(color.r),
        (color.a.clamp(0., 1.) * 255. + 0.5) as u8,
    ]
}

pub fn unpack_bgra8(bytes: [u8; 4]) -> RGBA128 {
    RGBA128::new(
        from_byte(bytes[2]),
        from_byte(bytes[1]),
        from_byte(bytes[0]),
        bytes[3] as f32 / 255.,
    )
}

/// 24-bpp layout: blue, green, red; alpha is implicitly opaque.
pub fn pack_bgr8(color: RGBA128) -> [u8; 3] {
    [to_byte(color.b), to_byte(color.g), to_byte(color.r)]
}

pub fn unpack_bgr8(bytes: [u8; 3]) -> RGBA128 {
    RGBA128::new(from_byte(bytes[2]), from_byte(bytes[1]), from_byte(bytes[0]), 1.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_round_trips() {
        for i in 0..=1000 {
            let x = i as f32 / 1000.;
            let there_and_back = inverse(forward(x));
            assert!((there_and_back - x).abs() < 1e-5, "at {}", x);
        }
    }

    #[test]
    fn transfer_is_continuous_at_the_threshold() {
        let below = forward(THRESHOLD - 1e-6);
        let above = forward(THRESHOLD + 1e-6);
        assert!((above - below).abs() < 1e-4);
    }

    #[test]
    fn byte_layouts_put_blue_first() {
        let color = RGBA128::new(1., 0., 0., 0.5);
        let bgra = pack_bgra8(color);
        assert_eq!(bgra[0], 0, "blue channel leads");
        assert_eq!(bgra[2], 255);
        assert_eq!(bgra[3], 128);

        let back = unpack_bgra8(bgra);
        assert!((back.r - 1.).abs() < 1e-2);
        assert!(back.g < 1e-3);
        assert!((back.a - 0.5).abs() < 1e-2);

        let bgr = pack_bgr8(color);
        assert_eq!(bgr.len(), 3);
        assert_eq!(unpack_bgr8(bgr).a, 1.);
    }
}
