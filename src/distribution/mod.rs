pub mod continuous;
pub mod discrete;

pub use continuous::{ContinuousDistribution, Sample1D, Sample2D};
pub use discrete::{DiscreteDistribution1D, DiscreteDistribution2D, Probable};
