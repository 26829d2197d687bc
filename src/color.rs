// Radiance-carrying color types. `RGB128` is the working currency of the
// evaluators; `RGBA128` only appears at the buffer edges and in literals.

use crate::math::vector::Vec3d;

use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;

use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RGB128 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RGB128 {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        RGB128 { r, g, b }
    }

    pub fn black() -> Self {
        RGB128::splat(0.)
    }

    pub fn white() -> Self {
        RGB128::splat(1.)
    }

    pub fn splat(v: f32) -> Self {
        RGB128 { r: v, g: v, b: v }
    }

    pub fn is_black(self) -> bool {
        self.r == 0. && self.g == 0. && self.b == 0.
    }

    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    pub fn scale(self, s: f32) -> Self {
        RGB128 {
            r: self.r * s,
            g: self.g * s,
            b: self.b * s,
        }
    }

    pub fn max_component(self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    pub fn luminance(self) -> f32 {
        0.212671 * self.r + 0.715160 * self.g + 0.072169 * self.b
    }

    pub fn lerp(self, o: Self, t: f32) -> Self {
        self.scale(1. - t) + o.scale(t)
    }

    pub fn sqrt(self) -> Self {
        RGB128 {
            r: self.r.sqrt(),
            g: self.g.sqrt(),
            b: self.b.sqrt(),
        }
    }

    pub fn to_vec3d(self) -> Vec3d {
        Vec3d::new(self.r as f64, self.g as f64, self.b as f64)
    }

    pub fn from_vec3d(v: Vec3d) -> Self {
        RGB128::new(v.x as f32, v.y as f32, v.z as f32)
    }
}

impl Add for RGB128 {
    type Output = Self;

    fn add(self, o: Self) -> Self {
        RGB128 {
            r: self.r + o.r,
            g: self.g + o.g,
            b: self.b + o.b,
        }
    }
}

impl AddAssign for RGB128 {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Sub for RGB128 {
    type Output = Self;

    fn sub(self, o: Self) -> Self {
        RGB128 {
            r: self.r - o.r,
            g: self.g - o.g,
            b: self.b - o.b,
        }
    }
}

impl Mul for RGB128 {
    type Output = Self;

    fn mul(self, o: Self) -> Self {
        RGB128 {
            r: self.r * o.r,
            g: self.g * o.g,
            b: self.b * o.b,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RGBA128 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RGBA128 {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        RGBA128 { r, g, b, a }
    }

    pub fn opaque(rgb: RGB128) -> Self {
        RGBA128 {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
            a: 1.,
        }
    }

    pub fn rgb(self) -> RGB128 {
        RGB128 {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ColorParseError {
    #[error("unrecognized color literal `{0}`")]
    UnknownForm(String),
    #[error("hex literal has {0} digits; expected 1, 3, 4, 6, or 8")]
    BadHexLength(usize),
    #[error("malformed channel value `{0}`")]
    BadChannel(String),
}

impl FromStr for RGBA128 {
    type Err = ColorParseError;

    /// Accepts `0x…`/`#…` hex (1/3/4/6/8 digits), `rgb(r, g, b[, a])` with
    /// 0-255 integers, and `hdr(r, g, b[, a])` with raw floats. Missing
    /// alpha is fully opaque.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let content = content.trim();

        if let Some(hex) = content
            .strip_prefix("0x")
            .or_else(|| content.strip_prefix('#'))
        {
            return parse_hex(hex.trim());
        }
        if let Some(body) = strip_call(content, "rgb") {
            let channels = parse_channels(body)?;
            return assemble(&channels, |v| v / 255.);
        }
        if let Some(body) = strip_call(content, "hdr") {
            let channels = parse_channels(body)?;
            return assemble(&channels, |v| v);
        }

        Err(ColorParseError::UnknownForm(content.to_string()))
    }
}

fn strip_call<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    content
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .trim_end()
        .strip_suffix(')')
}

fn parse_channels(body: &str) -> Result<Vec<f32>, ColorParseError> {
    body.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f32>()
                .map_err(|_| ColorParseError::BadChannel(part.to_string()))
        })
        .collect()
}

fn assemble(channels: &[f32], map: impl Fn(f32) -> f32) -> Result<RGBA128, ColorParseError> {
    match channels {
        [r, g, b] => Ok(RGBA128::new(map(*r), map(*g), map(*b), 1.)),
        [r, g, b, a] => Ok(RGBA128::new(map(*r), map(*g), map(*b), map(*a))),
        _ => Err(ColorParseError::BadChannel(format!(
            "{} channels",
            channels.len()
        ))),
    }
}

fn parse_hex(hex: &str) -> Result<RGBA128, ColorParseError> {
    let nibble = |c: char| -> Result<u32, ColorParseError> {
        c.to_digit(16)
            .ok_or_else(|| ColorParseError::BadChannel(c.to_string()))
    };
    let digits: Vec<u32> = hex.chars().map(nibble).collect::<Result<_, _>>()?;

    // A lone nibble expands to a gray value, short forms double each digit.
    let short = |d: u32| (d * 17) as f32 / 255.;
    let wide = |hi: u32, lo: u32| (hi * 16 + lo) as f32 / 255.;

    match digits.as_slice() {
        [g] => Ok(RGBA128::new(short(*g), short(*g), short(*g), 1.)),
        [r, g, b] => Ok(RGBA128::new(short(*r), short(*g), short(*b), 1.)),
        [r, g, b, a] => Ok(RGBA128::new(short(*r), short(*g), short(*b), short(*a))),
        [r1, r0, g1, g0, b1, b0] => Ok(RGBA128::new(
            wide(*r1, *r0),
            wide(*g1, *g0),
            wide(*b1, *b0),
            1.,
        )),
        [r1, r0, g1, g0, b1, b0, a1, a0] => Ok(RGBA128::new(
            wide(*r1, *r0),
            wide(*g1, *g0),
            wide(*b1, *b0),
            wide(*a1, *a0),
        )),
        _ => Err(ColorParseError::BadHexLength(digits.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms_parse() {
        assert_eq!(
            "#fff".parse::<RGBA128>().unwrap(),
            RGBA128::new(1., 1., 1., 1.)
        );
        assert_eq!(
            "0xff0000".parse::<RGBA128>().unwrap(),
            RGBA128::new(1., 0., 0., 1.)
        );
        let gray = "#8".parse::<RGBA128>().unwrap();
        assert!((gray.r - 136. / 255.).abs() < 1e-6);
        assert_eq!(gray.a, 1.);
        let rgba = "#80808080".parse::<RGBA128>().unwrap();
        assert!((rgba.a - 128. / 255.).abs() < 1e-6);
    }

    #[test]
    fn functional_forms_parse() {
        let c = "rgb(255, 0, 128)".parse::<RGBA128>().unwrap();
        assert_eq!(c.r, 1.);
        assert!((c.b - 128. / 255.).abs() < 1e-6);
        assert_eq!(c.a, 1.);

        let h = " hdr(2.5, 0.5, 1.0, 0.25) ".parse::<RGBA128>().unwrap();
        assert_eq!(h, RGBA128::new(2.5, 0.5, 1.0, 0.25));
    }

    #[test]
    fn malformed_literals_are_rejected() {
        assert!("".parse::<RGBA128>().is_err());
        assert!("#12345".parse::<RGBA128>().is_err());
        assert!("rgb(1, 2)".parse::<RGBA128>().is_err());
        assert!("hsl(1, 2, 3)".parse::<RGBA128>().is_err());
    }

    #[test]
    fn luminance_weighs_green_highest() {
        let g = RGB128::new(0., 1., 0.).luminance();
        let r = RGB128::new(1., 0., 0.).luminance();
        let b = RGB128::new(0., 0., 1.).luminance();
        assert!(g > r && r > b);
    }
}
