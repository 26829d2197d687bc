use crate::distribution::{DiscreteDistribution1D, Probable, Sample1D};
use crate::scene::token::EntityToken;

/// Importance table over a pack's radiating entities. Tokens are laid out
/// in segments (one per emissive material, one for nested instances); each
/// token is weighted by surface area times radiant power, so `pick`
/// returns brighter and bigger emitters proportionally more often.
pub struct PowerDistribution {
    tokens: Vec<EntityToken>,
    segment_starts: Vec<usize>,
    distribution: DiscreteDistribution1D,
}

/// One segment handed to the builder: its tokens and their weights.
pub struct PowerSegment {
    pub tokens: Vec<EntityToken>,
    pub weights: Vec<f64>,
}

impl PowerDistribution {
    /// `None` when nothing radiates.
    pub fn new(segments: Vec<PowerSegment>) -> Option<Self> {
        let mut tokens = Vec::new();
        let mut weights = Vec::new();
        let mut segment_starts = Vec::with_capacity(segments.len());

        for segment in segments {
            debug_assert_eq!(segment.tokens.len(), segment.weights.len());
            segment_starts.push(tokens.len());
            tokens.extend(segment.tokens);
            weights.extend(segment.weights);
        }

        if tokens.is_empty() || weights.iter().all(|w| *w <= 0.) {
            return None;
        }

        Some(PowerDistribution {
            tokens,
            segment_starts,
            distribution: DiscreteDistribution1D::new(&weights),
        })
    }

    pub fn pick(&self, sample: Sample1D) -> Probable<EntityToken> {
        let picked = self.distribution.pick(sample.value());
        Probable::new(self.tokens[picked.value], picked.pdf)
    }

    /// Total radiant power across all segments.
    pub fn total(&self) -> f64 {
        self.distribution.total()
    }

    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_starts.len()
    }
}
