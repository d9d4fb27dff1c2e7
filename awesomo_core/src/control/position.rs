// awesomo_core/src/control/position.rs

use nalgebra::{UnitQuaternion, Vector3};

use super::AttitudeLoops;
use crate::config::{ConfigError, PositionControllerConfig};
use crate::types::{AttitudeCommand, Pose, Vec3};

/// Drives the vehicle toward an absolute point in the inertial frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionController {
    loops: AttitudeLoops,
    /// The command produced by the last `calculate`.
    pub outputs: AttitudeCommand,
}

impl PositionController {
    pub fn new(config: PositionControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            loops: AttitudeLoops::new(
                [config.x, config.y, config.z],
                config.roll_limit,
                config.pitch_limit,
                config.hover_throttle,
            )?,
            outputs: AttitudeCommand::neutral(),
        })
    }

    /// # Arguments
    /// * `setpoint`: Desired position in the inertial frame.
    /// * `pose`: Current vehicle pose.
    /// * `yaw_setpoint`: Desired heading, passed straight through to the command.
    /// * `dt`: Seconds since the previous call.
    pub fn calculate(
        &mut self,
        setpoint: &Vec3,
        pose: &Pose,
        yaw_setpoint: f64,
        dt: f64,
    ) -> AttitudeCommand {
        let errors = self.body_planar_errors(setpoint, pose);
        self.outputs = self.loops.calculate(&errors, yaw_setpoint, dt);
        self.outputs
    }

    /// Position error with the horizontal part rotated into the vehicle's
    /// heading.
    pub fn body_planar_errors(&self, setpoint: &Vec3, pose: &Pose) -> Vec3 {
        let world = setpoint - pose.position;
        let heading = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), pose.yaw());
        heading.inverse_transform_vector(&world)
    }

    pub fn reset(&mut self) {
        self.loops.reset();
        self.outputs = AttitudeCommand::neutral();
    }
}
