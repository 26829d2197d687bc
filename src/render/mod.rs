pub mod buffer;
pub mod camera;
pub mod device;
pub mod pixel;
pub mod post;
pub mod profile;
pub mod tile;

pub use buffer::{Layer, RenderBuffer};
pub use camera::PerspectiveCamera;
pub use device::{Device, OperationControl, OperationState};
pub use pixel::Pixel;
pub use profile::{ConfigurationError, EvaluatorProfile};
pub use tile::{TileContext, TileWorker};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum WorkerError {
    #[error("worker in invalid state: {0}")]
    InvalidState(&'static str),

    #[error("invalid render configuration: {0}")]
    InvalidConfiguration(String),

    #[error("operation aborted")]
    Aborted,
}

/// Cooperative scheduling hook. Workers poll this between pixel samples
/// (never inside a hot loop); implementations may block to pause and
/// return an error to abort.
pub trait Schedule: Send + Sync {
    fn check(&self) -> Result<(), WorkerError>;
}

/// Schedule that never pauses nor aborts, for workers driven directly.
pub struct FreeSchedule;

impl Schedule for FreeSchedule {
    fn check(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}
