use crate::distribution::continuous::{ContinuousDistribution, Sample1D, Sample2D};
use crate::math::random::RandGen;
use crate::math::vector::{Vec2, Vec2d, Vec2i};

/// Stratified sample streams: every dimension of every pixel sees each
/// stratum exactly once, in shuffled order. In-pixel array requests use a
/// Latin hypercube so both axes stay stratified at any count.
#[derive(Clone, Debug)]
pub struct StratifiedDistribution {
    sample_size: Vec2i,
    sample_count: u32,
    dimensions: usize,
    jitter: bool,
    epoch: u64,

    // Dimension-major: dim0 sample0, dim0 sample1, ..., dim1 sample0, ...
    samples_1d: Vec<f64>,
    samples_2d: Vec<Vec2d>,

    curr_sample: u32,
    curr_1d: usize,
    curr_2d: usize,

    rng: RandGen,
}

impl StratifiedDistribution {
    pub fn new(sample_size: Vec2i, dimensions: usize, jitter: bool) -> Self {
        assert!(sample_size.x > 0 && sample_size.y > 0);
        let sample_count = (sample_size.x * sample_size.y) as u32;

        StratifiedDistribution {
            sample_size,
            sample_count,
            dimensions,
            jitter,
            epoch: 0,
            samples_1d: vec![0.; dimensions * sample_count as usize],
            samples_2d: vec![Vec2d::zero(); dimensions * sample_count as usize],
            curr_sample: 0,
            curr_1d: 0,
            curr_2d: 0,
            rng: RandGen::new(0),
        }
    }

    fn jitter_value(&mut self) -> f64 {
        if self.jitter {
            self.rng.uniform_f64()
        } else {
            0.5
        }
    }

    fn fill_stratified_1d(&mut self, dim: usize) {
        let count = self.sample_count as usize;
        for i in 0..count {
            let jitter = self.jitter_value();
            self.samples_1d[dim * count + i] =
                ((i as f64 + jitter) / count as f64).min(RandGen::ONE_MINUS_EPS);
        }
        self.shuffle_1d(dim);
    }

    fn fill_stratified_2d(&mut self, dim: usize) {
        let count = self.sample_count as usize;
        let (nx, ny) = (self.sample_size.x as usize, self.sample_size.y as usize);
        for y in 0..ny {
            for x in 0..nx {
                let jx = self.jitter_value();
                let jy = self.jitter_value();
                self.samples_2d[dim * count + y * nx + x] = Vec2 {
                    x: ((x as f64 + jx) / nx as f64).min(RandGen::ONE_MINUS_EPS),
                    y: ((y as f64 + jy) / ny as f64).min(RandGen::ONE_MINUS_EPS),
                };
            }
        }
        self.shuffle_2d(dim);
    }

    // Fisher-Yates over one dimension's pixel samples so consumption order
    // does not correlate with stratum order.
    fn shuffle_1d(&mut self, dim: usize) {
        let count = self.sample_count as usize;
        for i in (1..count).rev() {
            let j = self.rng.uniform_u32_limit(i as u32 + 1) as usize;
            self.samples_1d.swap(dim * count + i, dim * count + j);
        }
    }

    fn shuffle_2d(&mut self, dim: usize) {
        let count = self.sample_count as usize;
        for i in (1..count).rev() {
            let j = self.rng.uniform_u32_limit(i as u32 + 1) as usize;
            self.samples_2d.swap(dim * count + i, dim * count + j);
        }
    }

    /// Latin hypercube over `count` points: one point per row and per
    /// column regardless of `count`.
    pub fn latin_hypercube(rng: &mut RandGen, count: usize, jitter: bool) -> Vec<Vec2d> {
        let mut xs: Vec<usize> = (0..count).collect();
        let mut ys: Vec<usize> = (0..count).collect();
        for i in (1..count).rev() {
            xs.swap(i, rng.uniform_u32_limit(i as u32 + 1) as usize);
            ys.swap(i, rng.uniform_u32_limit(i as u32 + 1) as usize);
        }

        xs.iter()
            .zip(ys.iter())
            .map(|(&x, &y)| {
                let jx = if jitter { rng.uniform_f64() } else { 0.5 };
                let jy = if jitter { rng.uniform_f64() } else { 0.5 };
                Vec2 {
                    x: ((x as f64 + jx) / count as f64).min(RandGen::ONE_MINUS_EPS),
                    y: ((y as f64 + jy) / count as f64).min(RandGen::ONE_MINUS_EPS),
                }
            })
            .collect()
    }
}

impl ContinuousDistribution for StratifiedDistribution {
    fn begin_pixel(&mut self, position: Vec2i) {
        self.rng = RandGen::from_position(position, self.epoch);

        for dim in 0..self.dimensions {
            self.fill_stratified_1d(dim);
            self.fill_stratified_2d(dim);
        }

        self.curr_sample = 0;
        self.curr_1d = 0;
        self.curr_2d = 0;
    }

    fn begin_sample(&mut self, index: u32) {
        debug_assert!(index < self.sample_count);
        self.curr_sample = index;
        self.curr_1d = 0;
        self.curr_2d = 0;
    }

    fn next_1d(&mut self) -> Sample1D {
        // Dimensions past the precomputed tables degrade to the PRNG.
        if self.curr_1d == self.dimensions {
            return Sample1D::new(self.rng.uniform_f64());
        }

        let index = self.curr_1d * self.sample_count as usize + self.curr_sample as usize;
        self.curr_1d += 1;
        Sample1D::new(self.samples_1d[index])
    }

    fn next_2d(&mut self) -> Sample2D {
        if self.curr_2d == self.dimensions {
            return Sample2D::new(self.rng.uniform_vec2());
        }

        let index = self.curr_2d * self.sample_count as usize + self.curr_sample as usize;
        self.curr_2d += 1;
        Sample2D::new(self.samples_2d[index])
    }

    fn next_2d_array(&mut self, count: usize) -> Vec<Sample2D> {
        Self::latin_hypercube(&mut self.rng, count, self.jitter)
            .into_iter()
            .map(Sample2D::new)
            .collect()
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn replicate(&self, seed: u64) -> Box<dyn ContinuousDistribution> {
        let mut copy = StratifiedDistribution::new(self.sample_size, self.dimensions, self.jitter);
        copy.epoch = seed;
        copy.rng = RandGen::new(seed);
        Box::new(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution() -> StratifiedDistribution {
        StratifiedDistribution::new(Vec2i::new(4, 4), 2, true)
    }

    #[test]
    fn every_stratum_appears_once() {
        let mut dist = distribution();
        dist.begin_pixel(Vec2i::new(3, 5));

        let mut seen = [false; 16];
        for i in 0..16 {
            dist.begin_sample(i);
            let v = dist.next_1d().value();
            let stratum = (v * 16.) as usize;
            assert!(!seen[stratum], "stratum {} drawn twice", stratum);
            seen[stratum] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn grid_strata_cover_every_cell() {
        let mut dist = distribution();
        dist.begin_pixel(Vec2i::new(0, 0));

        let mut seen = [false; 16];
        for i in 0..16 {
            dist.begin_sample(i);
            let v = dist.next_2d().value();
            let cell = (v.y * 4.) as usize * 4 + (v.x * 4.) as usize;
            assert!(!seen[cell], "cell {} drawn twice", cell);
            seen[cell] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn no_jitter_yields_canonical_centers() {
        let mut dist = StratifiedDistribution::new(Vec2i::new(2, 2), 1, false);
        dist.begin_pixel(Vec2i::new(1, 1));

        let mut values: Vec<f64> = (0..4)
            .map(|i| {
                dist.begin_sample(i);
                dist.next_1d().value()
            })
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expect = [0.125, 0.375, 0.625, 0.875];
        for (v, e) in values.iter().zip(expect.iter()) {
            assert!((v - e).abs() < 1e-12);
        }
    }

    #[test]
    fn exhausted_dimensions_fall_back_to_rng() {
        let mut dist = StratifiedDistribution::new(Vec2i::new(2, 2), 1, true);
        dist.begin_pixel(Vec2i::new(0, 0));
        dist.begin_sample(0);
        let _ = dist.next_1d();
        // Past the configured dimension count; still usable.
        let v = dist.next_1d().value();
        assert!((0. ..1.).contains(&v));
    }

    #[test]
    fn latin_hypercube_is_stratified_on_both_axes() {
        let mut rng = RandGen::new(9);
        let points = StratifiedDistribution::latin_hypercube(&mut rng, 8, true);

        let mut rows = [false; 8];
        let mut cols = [false; 8];
        for p in points {
            let row = (p.y * 8.) as usize;
            let col = (p.x * 8.) as usize;
            assert!(!rows[row] && !cols[col]);
            rows[row] = true;
            cols[col] = true;
        }
    }

    #[test]
    fn replicated_streams_disagree() {
        let mut a = distribution();
        let mut b = a.replicate(99);
        a.begin_pixel(Vec2i::new(0, 0));
        b.begin_pixel(Vec2i::new(0, 0));
        a.begin_sample(0);
        b.begin_sample(0);
        // Same position but different worker seeds; the shuffles diverge.
        let va: Vec<f64> = (0..4).map(|_| a.next_1d().value()).collect();
        let vb: Vec<f64> = (0..4).map(|_| b.next_1d().value()).collect();
        assert_ne!(va, vb);
    }
}
