// awesomo_core/src/control/landing.rs

use super::AttitudeLoops;
use crate::config::{ConfigError, LandingControllerConfig};
use crate::types::{AttitudeCommand, Vec3};

/// Tracking with a commanded descent.
///
/// Same cascade as [`TrackingController`](super::TrackingController), except
/// the vertical velocity error is built from the configured descent rate:
/// `v_err.z = -descent_rate - climb_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct LandingController {
    loops: AttitudeLoops,
    velocity_gain: f64,
    descent_rate: f64,
    pub outputs: AttitudeCommand,
}

impl LandingController {
    pub fn new(config: LandingControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            loops: AttitudeLoops::new(
                [config.x, config.y, config.z],
                config.roll_limit,
                config.pitch_limit,
                config.hover_throttle,
            )?,
            velocity_gain: config.velocity_gain,
            descent_rate: config.descent_rate,
            outputs: AttitudeCommand::neutral(),
        })
    }

    pub fn descent_rate(&self) -> f64 {
        self.descent_rate
    }

    /// # Arguments
    /// * `position_errors`: Target position relative to the vehicle (x, y) and
    ///   altitude error (z), body-planar frame.
    /// * `velocity_errors`: Target velocity relative to the vehicle; only x and
    ///   y are used.
    /// * `climb_rate`: Current vertical velocity of the vehicle, m/s, up positive.
    pub fn calculate(
        &mut self,
        position_errors: &Vec3,
        velocity_errors: &Vec3,
        climb_rate: f64,
        yaw: f64,
        dt: f64,
    ) -> AttitudeCommand {
        let velocity_errors = Vec3::new(
            velocity_errors.x,
            velocity_errors.y,
            self.vertical_velocity_error(climb_rate),
        );
        let errors = position_errors + velocity_errors * self.velocity_gain;
        self.outputs = self.loops.calculate(&errors, yaw, dt);
        self.outputs
    }

    pub fn vertical_velocity_error(&self, climb_rate: f64) -> f64 {
        -self.descent_rate - climb_rate
    }

    pub fn prime(&mut self, position_errors: &Vec3) {
        self.loops.prime(position_errors);
    }

    pub fn reset(&mut self) {
        self.loops.reset();
        self.outputs = AttitudeCommand::neutral();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidConfig;
    use approx::assert_abs_diff_eq;

    fn controller() -> LandingController {
        LandingController::new(LandingControllerConfig {
            z: PidConfig::new(1.0, 0.0, 0.0),
            velocity_gain: 1.0,
            descent_rate: 0.2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_hovering_vehicle_is_pushed_down() {
        let mut c = controller();
        let cmd = c.calculate(&Vec3::zeros(), &Vec3::zeros(), 0.0, 0.0, 0.02);
        // hover 0.5 + z loop(-0.2)
        assert_abs_diff_eq!(cmd.throttle, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_descending_at_rate_holds_hover_throttle() {
        let mut c = controller();
        assert_abs_diff_eq!(c.vertical_velocity_error(-0.2), 0.0);
        let cmd = c.calculate(&Vec3::zeros(), &Vec3::new(0.0, 0.0, 5.0), -0.2, 0.0, 0.02);
        assert_abs_diff_eq!(cmd.throttle, 0.5, epsilon = 1e-12);
    }
}
