// awesomo_core/src/tracking/landing_target.rs

use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use super::frames::{target_in_body_planar, target_in_inertial, CameraMount};
use crate::clock::elapsed_secs;
use crate::config::{ConfigError, TargetConfig};
use crate::estimation::models::{from_motion_model, TransitionModel};
use crate::estimation::{EstimationError, KalmanFilter};
use crate::types::{GimbalState, Pose, TargetObservation, Vec3};

/// The landing pad as seen from the vehicle.
///
/// Turns raw camera detections into a body-planar position/velocity estimate
/// and keeps track of when the target was last seen.
#[derive(Debug, Clone)]
pub struct LandingTarget {
    lost_threshold: f64,
    process_noise: f64,
    measurement_noise: DMatrix<f64>,
    initial_covariance: f64,
    mount: CameraMount,
    model: Box<dyn TransitionModel>,
    estimator: KalmanFilter,

    measured_bf: Vec3,
    gimbal: Option<GimbalState>,
    detected: bool,
    losted: bool,
    last_updated_at: Option<Instant>,
}

impl LandingTarget {
    pub fn new(config: TargetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let estimator = config.estimator;
        Ok(Self {
            lost_threshold: config.lost_threshold,
            process_noise: estimator.process_noise,
            measurement_noise: DMatrix::from_diagonal(&DVector::from_row_slice(
                &estimator.measurement_noise,
            )),
            initial_covariance: estimator.initial_covariance,
            mount: CameraMount::from(config.camera_mount),
            model: from_motion_model(estimator.motion_model),
            estimator: KalmanFilter::new(),
            measured_bf: Vec3::zeros(),
            gimbal: None,
            detected: false,
            losted: true,
            last_updated_at: None,
        })
    }

    /// Feeds one detection cycle.
    ///
    /// # Arguments
    /// * `observation`: Raw detector output, camera frame.
    /// * `pose`: Vehicle pose at the time of the observation.
    /// * `dt`: Seconds since the previous update; the estimator is only
    ///   propagated when it is positive.
    /// * `now`: Sample of the mission clock.
    pub fn update(
        &mut self,
        observation: &TargetObservation,
        pose: &Pose,
        dt: f64,
        now: Instant,
    ) -> Result<(), EstimationError> {
        self.detected = observation.detected;

        if observation.detected {
            let tilt = observation
                .gimbal
                .map_or_else(|| pose.tilt(), |gimbal| gimbal.joint);
            self.measured_bf = target_in_body_planar(&self.mount, &observation.position, &tilt);
            self.gimbal = observation.gimbal;
            self.last_updated_at = Some(now);

            if !self.estimator.is_initialized() {
                self.init_estimator()?;
            }
        }

        if self.estimator.is_initialized() && dt > 0.0 {
            self.propagate(dt)?;
        }

        self.losted = self.is_target_losted(now);
        Ok(())
    }

    fn init_estimator(&mut self) -> Result<(), EstimationError> {
        let n = self.model.state_dim();
        let mut mean = DVector::zeros(n);
        mean.rows_mut(0, 3).copy_from(&self.measured_bf);

        self.estimator.init_with_covariance(
            mean,
            DMatrix::identity(n, n) * self.initial_covariance,
            self.model.process_noise(0.0, self.process_noise),
            self.model.position_observation(),
            self.measurement_noise.clone(),
        )?;
        debug!(position = ?self.measured_bf, "target estimator initialised");
        Ok(())
    }

    fn propagate(&mut self, dt: f64) -> Result<(), EstimationError> {
        self.estimator
            .set_process_noise(self.model.process_noise(dt, self.process_noise))?;

        let y = DVector::from_column_slice(self.measured_bf.as_slice());
        match self.estimator.estimate(&self.model.transition_matrix(dt), &y) {
            Err(EstimationError::SingularInnovation) => {
                warn!("singular innovation covariance, holding target estimate");
                Ok(())
            }
            other => other,
        }
    }

    /// Never seen, or not seen for longer than the lost threshold.
    pub fn is_target_losted(&self, now: Instant) -> bool {
        match elapsed_secs(self.last_updated_at, now) {
            Some(elapsed) => elapsed > self.lost_threshold,
            None => true,
        }
    }

    /// Estimated target position relative to the vehicle, body-planar frame.
    /// Falls back to the last measurement before the estimator has started.
    pub fn position_bf(&self) -> Vec3 {
        self.state_block(0).unwrap_or(self.measured_bf)
    }

    /// Estimated target velocity relative to the vehicle, body-planar frame.
    pub fn velocity_bf(&self) -> Vec3 {
        self.state_block(1).unwrap_or_else(Vec3::zeros)
    }

    /// Estimated relative acceleration, when the motion model has one.
    pub fn acceleration_bf(&self) -> Option<Vec3> {
        self.state_block(2)
    }

    fn state_block(&self, block: usize) -> Option<Vec3> {
        let mean = self.estimator.mean()?;
        let start = block * 3;
        if mean.nrows() < start + 3 {
            return None;
        }
        Some(Vec3::new(mean[start], mean[start + 1], mean[start + 2]))
    }

    /// The last detection in the body-planar frame, without filtering.
    pub fn measured_position_bf(&self) -> Vec3 {
        self.measured_bf
    }

    pub fn estimator(&self) -> &KalmanFilter {
        &self.estimator
    }

    pub fn is_estimating(&self) -> bool {
        self.estimator.is_initialized()
    }

    /// Whether the most recent observation was a detection.
    pub fn detected(&self) -> bool {
        self.detected
    }

    /// Lost flag as of the most recent update.
    pub fn losted(&self) -> bool {
        self.losted
    }

    pub fn last_updated_at(&self) -> Option<Instant> {
        self.last_updated_at
    }

    /// Estimated target position in the inertial frame, using the gimbal frame
    /// of the last detection when it had one, else the vehicle pose.
    pub fn inertial_position(&self, pose: &Pose) -> Option<Vec3> {
        self.last_updated_at?;
        let position_bf = self.position_bf();
        Some(match self.gimbal {
            Some(gimbal) => target_in_inertial(&position_bf, &gimbal.position, &gimbal.frame),
            None => target_in_inertial(&position_bf, &pose.position, &pose.orientation),
        })
    }

    pub fn reset(&mut self) {
        self.estimator = KalmanFilter::new();
        self.measured_bf = Vec3::zeros();
        self.gimbal = None;
        self.detected = false;
        self.losted = true;
        self.last_updated_at = None;
    }
}
