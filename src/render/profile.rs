use crate::accelerator::AcceleratorProfile;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigurationError {
    #[error("tile size must be positive, got {0}")]
    BadTileSize(u32),

    #[error("pixel sample count must be positive")]
    NoPixelSamples,

    #[error("bounce limit must be positive")]
    NoBounces,
}

/// Knobs of a render pass. Plain data; `validate` runs before anything is
/// dispatched so a bad profile can never cost a partial frame.
#[derive(Copy, Clone, Debug)]
pub struct EvaluatorProfile {
    /// Pixel edge length of one tile. Powers of two slot best into common
    /// buffer sizes but anything positive works.
    pub tile_size: u32,
    /// Deterministic base samples per pixel.
    pub pixel_sample: u32,
    /// Ceiling on extra samples per pixel; each pixel earns a share
    /// proportional to its normalized deviation.
    pub adaptive_sample: u32,
    /// Hard path depth cap.
    pub bounce_limit: u32,
    /// Stratification jitter; disable for reproducible canonical samples.
    pub jitter: bool,
    pub accelerator: AcceleratorProfile,
}

impl Default for EvaluatorProfile {
    fn default() -> Self {
        EvaluatorProfile {
            tile_size: 16,
            pixel_sample: 16,
            adaptive_sample: 0,
            bounce_limit: 128,
            jitter: true,
            accelerator: AcceleratorProfile::default(),
        }
    }
}

impl EvaluatorProfile {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.tile_size == 0 {
            return Err(ConfigurationError::BadTileSize(self.tile_size));
        }
        if self.pixel_sample == 0 {
            return Err(ConfigurationError::NoPixelSamples);
        }
        if self.bounce_limit == 0 {
            return Err(ConfigurationError::NoBounces);
        }
        Ok(())
    }

    /// Stratification grid whose cell count is exactly `pixel_sample`:
    /// the most square factorization available.
    pub fn sample_grid(&self) -> (i32, i32) {
        let n = self.pixel_sample as i32;
        let mut a = (n as f64).sqrt() as i32;
        while a > 1 && n % a != 0 {
            a -= 1;
        }
        (a.max(1), n / a.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_validates() {
        assert!(EvaluatorProfile::default().validate().is_ok());
    }

    #[test]
    fn invalid_profiles_are_caught() {
        let mut profile = EvaluatorProfile::default();
        profile.tile_size = 0;
        assert_eq!(profile.validate(), Err(ConfigurationError::BadTileSize(0)));

        let mut profile = EvaluatorProfile::default();
        profile.pixel_sample = 0;
        assert_eq!(profile.validate(), Err(ConfigurationError::NoPixelSamples));

        let mut profile = EvaluatorProfile::default();
        profile.bounce_limit = 0;
        assert_eq!(profile.validate(), Err(ConfigurationError::NoBounces));
    }

    #[test]
    fn sample_grids_multiply_back_exactly() {
        for n in [1u32, 2, 3, 4, 7, 12, 16, 25, 36, 100] {
            let mut profile = EvaluatorProfile::default();
            profile.pixel_sample = n;
            let (a, b) = profile.sample_grid();
            assert_eq!((a * b) as u32, n, "grid for {}", n);
        }
    }
}
