// awesomo_core/src/estimation/kf.rs

use nalgebra::{DMatrix, DVector};

use super::EstimationError;

/// Reciprocal condition number below which the innovation covariance is
/// treated as singular.
const SINGULAR_RCOND: f64 = 1e-12;

/// An SVD that has not converged after this many sweeps counts as singular.
const MAX_SVD_ITERATIONS: usize = 500;

/// The parts of the filter that only exist once `init` has been called.
#[derive(Debug, Clone, PartialEq)]
struct FilterState {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    process_noise: DMatrix<f64>,
    observation: DMatrix<f64>,
    measurement_noise: DMatrix<f64>,
}

/// A discrete linear Kalman filter.
///
/// The filter knows nothing about what it estimates: the caller supplies the
/// transition matrix on every `estimate` call, and the observation and noise
/// matrices once at `init`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KalmanFilter {
    state: Option<FilterState>,
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Initializes the filter with covariance set to identity.
    ///
    /// # Arguments
    /// * `mean`: Initial state estimate `x0` (length n).
    /// * `process_noise`: Process noise covariance `Q` (n x n).
    /// * `observation`: Observation matrix `C` (m x n).
    /// * `measurement_noise`: Measurement noise covariance `R` (m x m).
    pub fn init(
        &mut self,
        mean: DVector<f64>,
        process_noise: DMatrix<f64>,
        observation: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
    ) -> Result<(), EstimationError> {
        let n = mean.nrows();
        let covariance = DMatrix::identity(n, n);
        self.init_with_covariance(mean, covariance, process_noise, observation, measurement_noise)
    }

    /// Same as [`init`](Self::init) but with an explicit initial covariance.
    pub fn init_with_covariance(
        &mut self,
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        process_noise: DMatrix<f64>,
        observation: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
    ) -> Result<(), EstimationError> {
        let n = mean.nrows();
        let m = observation.nrows();
        check_shape("covariance", &covariance, (n, n))?;
        check_shape("process noise", &process_noise, (n, n))?;
        check_shape("observation matrix", &observation, (m, n))?;
        check_shape("measurement noise", &measurement_noise, (m, m))?;

        self.state = Some(FilterState {
            mean,
            covariance,
            process_noise,
            observation,
            measurement_noise,
        });
        Ok(())
    }

    /// Re-initializes the filter. Identical to [`init`](Self::init).
    pub fn reset(
        &mut self,
        mean: DVector<f64>,
        process_noise: DMatrix<f64>,
        observation: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
    ) -> Result<(), EstimationError> {
        self.init(mean, process_noise, observation, measurement_noise)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn dim(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.mean.nrows())
    }

    pub fn mean(&self) -> Option<&DVector<f64>> {
        self.state.as_ref().map(|s| &s.mean)
    }

    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.state.as_ref().map(|s| &s.covariance)
    }

    /// Replaces the process noise, e.g. when it depends on the time step.
    pub fn set_process_noise(&mut self, process_noise: DMatrix<f64>) -> Result<(), EstimationError> {
        let state = self.state.as_mut().ok_or(EstimationError::NotInitialized)?;
        let n = state.mean.nrows();
        check_shape("process noise", &process_noise, (n, n))?;
        state.process_noise = process_noise;
        Ok(())
    }

    /// Runs one predict/update cycle.
    ///
    /// # Arguments
    /// * `transition`: State transition matrix `A` for this step (n x n).
    /// * `y`: Measurement vector (length m).
    ///
    /// On error the filter state is left exactly as it was.
    pub fn estimate(
        &mut self,
        transition: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<(), EstimationError> {
        let state = self.state.as_mut().ok_or(EstimationError::NotInitialized)?;
        let n = state.mean.nrows();
        let m = state.observation.nrows();
        check_shape("transition matrix", transition, (n, n))?;
        if y.nrows() != m {
            return Err(EstimationError::DimensionMismatch {
                what: "measurement",
                expected: (m, 1),
                actual: (y.nrows(), 1),
            });
        }

        let c = &state.observation;

        // 1. Predict
        let mean_p = transition * &state.mean;
        let cov_p = transition * &state.covariance * transition.transpose() + &state.process_noise;

        // 2. Innovation covariance
        let s = c * &cov_p * c.transpose() + &state.measurement_noise;
        let s_inv = invert_checked(s)?;

        // 3. Gain
        let k_gain = &cov_p * c.transpose() * s_inv;

        // 4. Update
        let innovation = y - c * &mean_p;
        let mean = mean_p + &k_gain * innovation;
        let i_kc = DMatrix::<f64>::identity(n, n) - &k_gain * c;
        let covariance = i_kc * cov_p;

        state.mean = mean;
        // keep P symmetric
        state.covariance = (&covariance + covariance.transpose()) * 0.5;
        Ok(())
    }
}

fn check_shape(
    what: &'static str,
    matrix: &DMatrix<f64>,
    expected: (usize, usize),
) -> Result<(), EstimationError> {
    if matrix.shape() != expected {
        return Err(EstimationError::DimensionMismatch {
            what,
            expected,
            actual: matrix.shape(),
        });
    }
    Ok(())
}

fn invert_checked(s: DMatrix<f64>) -> Result<DMatrix<f64>, EstimationError> {
    if !s.iter().all(|v| v.is_finite()) {
        return Err(EstimationError::SingularInnovation);
    }
    let singular_values = s
        .clone()
        .try_svd(false, false, f64::EPSILON, MAX_SVD_ITERATIONS)
        .ok_or(EstimationError::SingularInnovation)?
        .singular_values;
    let max = singular_values.max();
    let rcond = if max > 0.0 {
        singular_values.min() / max
    } else {
        0.0
    };
    if !rcond.is_finite() || rcond < SINGULAR_RCOND {
        return Err(EstimationError::SingularInnovation);
    }
    s.try_inverse().ok_or(EstimationError::SingularInnovation)
}
