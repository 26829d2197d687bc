// Discrete distributions with precomputed cumulative tables. These are built
// once at preparation time and shared read-only between workers.

use crate::math::vector::Vec2d;

/// A value paired with the probability density it was drawn with. A zero
/// pdf marks the degenerate outcome; callers must not divide by it.
#[derive(Copy, Clone, Debug)]
pub struct Probable<T> {
    pub value: T,
    pub pdf: f64,
}

impl<T> Probable<T> {
    pub fn new(value: T, pdf: f64) -> Self {
        Probable { value, pdf }
    }

    pub fn impossible(value: T) -> Self {
        Probable { value, pdf: 0. }
    }

    pub fn is_impossible(&self) -> bool {
        self.pdf == 0.
    }
}

/// Piecewise-constant distribution over `[0, 1)` backed by `n` weights.
#[derive(Clone, Debug)]
pub struct DiscreteDistribution1D {
    function: Vec<f64>,
    cdf: Vec<f64>,
    integral: f64,
}

impl DiscreteDistribution1D {
    pub fn new(weights: &[f64]) -> Self {
        assert!(!weights.is_empty(), "empty distribution");
        debug_assert!(weights.iter().all(|w| *w >= 0. && w.is_finite()));

        let n = weights.len();
        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.);
        for (i, w) in weights.iter().enumerate() {
            cdf.push(cdf[i] + w / n as f64);
        }

        let integral = cdf[n];
        if integral == 0. {
            // All weights vanish; fall back to the uniform table so that
            // sampling still terminates.
            for (i, v) in cdf.iter_mut().enumerate() {
                *v = i as f64 / n as f64;
            }
        } else {
            for v in cdf.iter_mut() {
                *v /= integral;
            }
        }

        DiscreteDistribution1D {
            function: weights.to_vec(),
            cdf,
            integral,
        }
    }

    pub fn count(&self) -> usize {
        self.function.len()
    }

    /// Mean of the backing function (the normalization constant of the
    /// continuous density).
    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn total(&self) -> f64 {
        self.integral * self.function.len() as f64
    }

    fn find_interval(&self, u: f64) -> usize {
        // Last entry with cdf <= u; the cdf is monotone.
        let mut lo = 0usize;
        let mut hi = self.cdf.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.cdf[mid] <= u {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo.min(self.function.len() - 1)
    }

    /// Draws an index with probability proportional to its weight.
    pub fn pick(&self, u: f64) -> Probable<usize> {
        let index = self.find_interval(u);
        if self.integral == 0. {
            return Probable::new(index, 1. / self.function.len() as f64);
        }
        Probable::new(index, self.function[index] / self.total())
    }

    /// Draws a continuous position in `[0, 1)` along with its density and
    /// the index of the stratum it landed in.
    pub fn sample(&self, u: f64) -> (Probable<f64>, usize) {
        let index = self.find_interval(u);
        let lo = self.cdf[index];
        let hi = self.cdf[index + 1];

        let du = if hi > lo { (u - lo) / (hi - lo) } else { 0. };
        let x = (index as f64 + du) / self.function.len() as f64;

        let pdf = if self.integral > 0. {
            self.function[index] / self.integral
        } else {
            1.
        };
        (Probable::new(x, pdf), index)
    }

    /// Density of the stratum containing `x` in `[0, 1)`.
    pub fn probability_density(&self, x: f64) -> f64 {
        let index = ((x * self.function.len() as f64) as usize).min(self.function.len() - 1);
        if self.integral > 0. {
            self.function[index] / self.integral
        } else {
            1.
        }
    }
}

/// Product distribution over the unit square: one conditional row
/// distribution per `y`, one marginal across rows.
#[derive(Clone, Debug)]
pub struct DiscreteDistribution2D {
    conditionals: Vec<DiscreteDistribution1D>,
    marginal: DiscreteDistribution1D,
}

impl DiscreteDistribution2D {
    /// `weights` is row-major, `width * height` entries.
    pub fn new(weights: &[f64], width: usize, height: usize) -> Self {
        assert_eq!(weights.len(), width * height);

        let conditionals: Vec<_> = (0..height)
            .map(|y| DiscreteDistribution1D::new(&weights[y * width..(y + 1) * width]))
            .collect();
        let row_integrals: Vec<f64> = conditionals.iter().map(|c| c.integral()).collect();
        let marginal = DiscreteDistribution1D::new(&row_integrals);

        DiscreteDistribution2D {
            conditionals,
            marginal,
        }
    }

    /// Continuous `(u, v)` sample with its joint density over the square.
    pub fn sample(&self, u: Vec2d) -> Probable<Vec2d> {
        let (v_sample, row) = self.marginal.sample(u.y);
        let (u_sample, _) = self.conditionals[row].sample(u.x);
        Probable::new(
            Vec2d::new(u_sample.value, v_sample.value),
            u_sample.pdf * v_sample.pdf,
        )
    }

    pub fn probability_density(&self, uv: Vec2d) -> f64 {
        let row = ((uv.y * self.conditionals.len() as f64) as usize)
            .min(self.conditionals.len() - 1);
        self.marginal.probability_density(uv.y) * self.conditionals[row].probability_density(uv.x)
    }

    pub fn integral(&self) -> f64 {
        self.marginal.integral()
    }
}
