//! Error taxonomy for the detection engine

use crate::models::Parameter;
use thiserror::Error;

/// Errors surfaced at the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// Too few samples to train or assess; skip this cycle and retry on the
    /// next one.
    #[error("insufficient data: {actual} samples, need at least {required}")]
    InsufficientData { required: usize, actual: usize },

    /// A reading carries a non-finite value for a required feature. This is
    /// a data-quality bug upstream and is surfaced, never zero-filled.
    #[error("reading {index} has no usable {parameter} value")]
    MissingFeature { parameter: Parameter, index: usize },

    /// Configuration rejected at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
