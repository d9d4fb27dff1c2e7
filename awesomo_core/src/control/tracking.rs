// awesomo_core/src/control/tracking.rs

use super::AttitudeLoops;
use crate::config::{ConfigError, TrackingControllerConfig};
use crate::types::{AttitudeCommand, Vec3};

/// Keeps the vehicle above a moving target.
///
/// Errors are the target's position and velocity relative to the vehicle in
/// the body-planar frame; the velocity part damps the response by leading the
/// position error.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingController {
    loops: AttitudeLoops,
    velocity_gain: f64,
    pub outputs: AttitudeCommand,
}

impl TrackingController {
    pub fn new(config: TrackingControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            loops: AttitudeLoops::new(
                [config.x, config.y, config.z],
                config.roll_limit,
                config.pitch_limit,
                config.hover_throttle,
            )?,
            velocity_gain: config.velocity_gain,
            outputs: AttitudeCommand::neutral(),
        })
    }

    pub fn calculate(
        &mut self,
        position_errors: &Vec3,
        velocity_errors: &Vec3,
        yaw: f64,
        dt: f64,
    ) -> AttitudeCommand {
        let errors = position_errors + velocity_errors * self.velocity_gain;
        self.outputs = self.loops.calculate(&errors, yaw, dt);
        self.outputs
    }

    /// Starts the horizontal loops from the current error instead of zero.
    pub fn prime(&mut self, position_errors: &Vec3) {
        self.loops.prime(position_errors);
    }

    pub fn reset(&mut self) {
        self.loops.reset();
        self.outputs = AttitudeCommand::neutral();
    }
}
