// awesomo_core/src/estimation/models.rs

use dyn_clone::DynClone;
use nalgebra::DMatrix;
use std::fmt::Debug;

use crate::config::MotionModel;

/// Number of spatial axes every kinematic model tracks.
const AXES: usize = 3;

// --- TRANSITION MODEL TRAIT ---
// Supplies the linear `x_k+1 = A(dt) x_k` the estimator is driven with.
/// A linear kinematic model for the target. The state is laid out in blocks
/// of three: position, then velocity, then (optionally) acceleration.
pub trait TransitionModel: DynClone + Debug + Send + Sync {
    /// Length of the state vector.
    fn state_dim(&self) -> usize;

    /// The state transition matrix `A` for a step of `dt` seconds.
    fn transition_matrix(&self, dt: f64) -> DMatrix<f64>;

    /// Discrete process noise covariance for a step of `dt` seconds driven by
    /// white noise of the given intensity on the highest modelled derivative.
    fn process_noise(&self, dt: f64, intensity: f64) -> DMatrix<f64>;

    /// The observation matrix that picks the position block out of the state.
    fn position_observation(&self) -> DMatrix<f64> {
        let mut c = DMatrix::zeros(AXES, self.state_dim());
        for axis in 0..AXES {
            c[(axis, axis)] = 1.0;
        }
        c
    }
}

// This macro generates `Clone` for `Box<dyn TransitionModel>`.
dyn_clone::clone_trait_object!(TransitionModel);

/// Builds the model selected in the configuration.
pub fn from_motion_model(model: MotionModel) -> Box<dyn TransitionModel> {
    match model {
        MotionModel::ConstantVelocity => Box::new(ConstantVelocityModel),
        MotionModel::ConstantAcceleration => Box::new(ConstantAccelerationModel),
    }
}

// --- Constant Velocity Model ---
// State: [px, py, pz, vx, vy, vz]
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantVelocityModel;

impl TransitionModel for ConstantVelocityModel {
    fn state_dim(&self) -> usize {
        2 * AXES
    }

    fn transition_matrix(&self, dt: f64) -> DMatrix<f64> {
        kinematic_transition(2, dt)
    }

    fn process_noise(&self, dt: f64, intensity: f64) -> DMatrix<f64> {
        kinematic_noise(2, dt, intensity)
    }
}

// --- Constant Acceleration Model ---
// State: [px, py, pz, vx, vy, vz, ax, ay, az]
// Acceleration is assumed to change slowly; jerk is modelled as noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantAccelerationModel;

impl TransitionModel for ConstantAccelerationModel {
    fn state_dim(&self) -> usize {
        3 * AXES
    }

    fn transition_matrix(&self, dt: f64) -> DMatrix<f64> {
        kinematic_transition(3, dt)
    }

    fn process_noise(&self, dt: f64, intensity: f64) -> DMatrix<f64> {
        kinematic_noise(3, dt, intensity)
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// `A[j][k] = dt^(k-j) / (k-j)!` for every block pair with `k >= j`.
fn kinematic_transition(blocks: usize, dt: f64) -> DMatrix<f64> {
    let n = blocks * AXES;
    let mut a = DMatrix::zeros(n, n);
    for j in 0..blocks {
        for k in j..blocks {
            let order = k - j;
            let coeff = dt.powi(order as i32) / factorial(order);
            for axis in 0..AXES {
                a[(j * AXES + axis, k * AXES + axis)] = coeff;
            }
        }
    }
    a
}

/// `Q = q * g g^T` per axis, with `g_j = dt^(blocks-j) / (blocks-j)!`.
fn kinematic_noise(blocks: usize, dt: f64, intensity: f64) -> DMatrix<f64> {
    let n = blocks * AXES;
    let g: Vec<f64> = (0..blocks)
        .map(|j| {
            let order = blocks - j;
            dt.powi(order as i32) / factorial(order)
        })
        .collect();

    let mut q = DMatrix::zeros(n, n);
    for j in 0..blocks {
        for k in 0..blocks {
            for axis in 0..AXES {
                q[(j * AXES + axis, k * AXES + axis)] = intensity * g[j] * g[k];
            }
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    #[test]
    fn test_constant_acceleration_propagates_kinematics() {
        let model = ConstantAccelerationModel;
        let a = model.transition_matrix(0.5);

        // p = 1, v = 2, a = 4 on x
        let mut x = DVector::zeros(9);
        x[0] = 1.0;
        x[3] = 2.0;
        x[6] = 4.0;

        let next = &a * x;
        assert_abs_diff_eq!(next[0], 1.0 + 2.0 * 0.5 + 0.5 * 4.0 * 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], 2.0 + 4.0 * 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(next[6], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 0.0);
    }

    #[test]
    fn test_constant_velocity_shapes() {
        let model = ConstantVelocityModel;
        assert_eq!(model.transition_matrix(0.1).shape(), (6, 6));
        assert_eq!(model.process_noise(0.1, 1.0).shape(), (6, 6));
        assert_eq!(model.position_observation().shape(), (3, 6));
        assert_abs_diff_eq!(model.transition_matrix(0.1)[(0, 3)], 0.1);
    }

    #[test]
    fn test_process_noise_is_symmetric() {
        let q = ConstantAccelerationModel.process_noise(0.02, 0.7);
        assert_abs_diff_eq!((&q - q.transpose()).amax(), 0.0);
        assert!(q[(0, 0)] > 0.0);
    }

    #[test]
    fn test_boxed_models_clone() {
        let model = from_motion_model(MotionModel::ConstantVelocity);
        let copy = model.clone();
        assert_eq!(copy.state_dim(), 6);
    }
}
