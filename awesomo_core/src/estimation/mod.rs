// awesomo_core/src/estimation/mod.rs

use thiserror::Error;

/// Failures of the linear estimator. None of them mutate the filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimationError {
    #[error("estimator used before init")]
    NotInitialized,
    #[error("innovation covariance is singular")]
    SingularInnovation,
    #[error("{what}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub mod kf;
pub mod models;

pub use kf::KalmanFilter;
pub use models::{ConstantAccelerationModel, ConstantVelocityModel, TransitionModel};
