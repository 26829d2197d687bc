// The floating-point image format: full-precision pixels with cheap
// delta compression. Neighboring pixels share most of their float bits,
// so XOR-ing each channel against its predecessor leaves mostly zero
// bytes for the variable-length encoding to swallow.

use crate::color::RGB128;
use crate::math::vector::Vec2i;

use thiserror::Error;

const VERSION: u32 = 1;

#[derive(Error, Debug, PartialEq)]
pub enum FpiError {
    #[error("unsupported image version {0}")]
    BadVersion(u32),

    #[error("image data ended early")]
    Truncated,

    #[error("image dimensions {0}x{1} are invalid")]
    BadSize(i32, i32),
}

/// Serializes one layer, row-major with `(0, 0)` bottom-left.
pub fn serialize(size: Vec2i, pixels: &[RGB128]) -> Vec<u8> {
    assert_eq!(pixels.len(), (size.x * size.y) as usize);

    let mut out = Vec::with_capacity(pixels.len() * 6);
    write_vlq(&mut out, VERSION);
    write_vlq(&mut out, size.x as u32);
    write_vlq(&mut out, size.y as u32);

    let mut previous = [0u32; 4];
    for pixel in pixels {
        let channels = [
            pixel.r.to_bits(),
            pixel.g.to_bits(),
            pixel.b.to_bits(),
            1f32.to_bits(),
        ];
        for (prev, channel) in previous.iter_mut().zip(channels.iter()) {
            write_vlq(&mut out, *prev ^ *channel);
            *prev = *channel;
        }
    }
    out
}

pub fn deserialize(data: &[u8]) -> Result<(Vec2i, Vec<RGB128>), FpiError> {
    let mut cursor = 0usize;

    let version = read_vlq(data, &mut cursor)?;
    if version != VERSION {
        return Err(FpiError::BadVersion(version));
    }

    let width = read_vlq(data, &mut cursor)? as i32;
    let height = read_vlq(data, &mut cursor)? as i32;
    if width <= 0 || height <= 0 {
        return Err(FpiError::BadSize(width, height));
    }

    let count = (width * height) as usize;
    let mut pixels = Vec::with_capacity(count);
    let mut previous = [0u32; 4];
    for _ in 0..count {
        for prev in previous.iter_mut() {
            *prev ^= read_vlq(data, &mut cursor)?;
        }
        pixels.push(RGB128::new(
            f32::from_bits(previous[0]),
            f32::from_bits(previous[1]),
            f32::from_bits(previous[2]),
        ));
    }

    Ok((Vec2i::new(width, height), pixels))
}

// Unsigned little-endian base-128: seven payload bits per byte, high bit
// flags continuation.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_vlq(data: &[u8], cursor: &mut usize) -> Result<u32, FpiError> {
    let mut value = 0u32;
    let mut shift = 0u32;
    loop {
        let byte = *data.get(*cursor).ok_or(FpiError::Truncated)?;
        *cursor += 1;
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 32 {
            return Err(FpiError::Truncated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::random::RandGen;

    #[test]
    fn vlq_round_trips_extremes() {
        for value in [0u32, 1, 127, 128, 16_383, 16_384, u32::MAX] {
            let mut buffer = Vec::new();
            write_vlq(&mut buffer, value);
            let mut cursor = 0;
            assert_eq!(read_vlq(&buffer, &mut cursor), Ok(value));
            assert_eq!(cursor, buffer.len());
        }
    }

    #[test]
    fn image_round_trip_is_bit_exact() {
        let size = Vec2i::new(13, 7);
        let mut rng = RandGen::new(37);
        let pixels: Vec<RGB128> = (0..(13 * 7))
            .map(|_| {
                RGB128::new(
                    (rng.uniform_f64() * 10.) as f32,
                    rng.uniform_f64() as f32,
                    (rng.uniform_f64() - 0.5) as f32,
                )
            })
            .collect();

        let data = serialize(size, &pixels);
        let (read_size, read_pixels) = deserialize(&data).unwrap();

        assert_eq!(read_size, size);
        for (a, b) in pixels.iter().zip(read_pixels.iter()) {
            assert_eq!(a.r.to_bits(), b.r.to_bits());
            assert_eq!(a.g.to_bits(), b.g.to_bits());
            assert_eq!(a.b.to_bits(), b.b.to_bits());
        }
    }

    #[test]
    fn smooth_gradients_compress_well() {
        let size = Vec2i::new(64, 64);
        let pixels: Vec<RGB128> = (0..64 * 64)
            .map(|i| RGB128::splat((i % 64) as f32 / 64.))
            .collect();
        let data = serialize(size, &pixels);
        // Raw storage would be 16 bytes a pixel.
        assert!(data.len() < 64 * 64 * 16 / 2, "got {} bytes", data.len());
    }

    #[test]
    fn malformed_streams_are_rejected() {
        assert_eq!(deserialize(&[]), Err(FpiError::Truncated));
        // Version 2 is unknown.
        assert_eq!(deserialize(&[2, 4, 4]), Err(FpiError::BadVersion(2)));
        // Valid header, missing pixel payload.
        let data = serialize(Vec2i::new(2, 2), &[RGB128::black(); 4]);
        assert_eq!(deserialize(&data[..data.len() - 1]), Err(FpiError::Truncated));
    }
}
