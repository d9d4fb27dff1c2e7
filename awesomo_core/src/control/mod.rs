// awesomo_core/src/control/mod.rs

//! Feedback controllers.
//!
//! All attitude controllers share the same cascade: three PID loops turn an
//! error vector expressed in the body-planar NWU frame (x forward, y left,
//! z up) into a roll/pitch/throttle command.

use crate::config::{ConfigError, PidConfig};
use crate::types::{AttitudeCommand, Vec3};

pub mod carrot;
pub mod landing;
pub mod pid;
pub mod position;
pub mod tracking;

pub use carrot::{CarrotFollower, RouteError, RouteStatus, WaypointSegment};
pub use landing::LandingController;
pub use pid::Pid;
pub use position::PositionController;
pub use tracking::TrackingController;

/// Lower bound on `|cos(roll) * cos(pitch)|` used for tilt compensation.
const MIN_TILT_COS: f64 = 1e-3;

/// The x / y / z loop triple plus the limits applied to its output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttitudeLoops {
    x: Pid,
    y: Pid,
    z: Pid,
    roll_limit: [f64; 2],
    pitch_limit: [f64; 2],
    hover_throttle: f64,
}

impl AttitudeLoops {
    pub(crate) fn new(
        axes: [PidConfig; 3],
        roll_limit: [f64; 2],
        pitch_limit: [f64; 2],
        hover_throttle: f64,
    ) -> Result<Self, ConfigError> {
        let [x, y, z] = axes;
        Ok(Self {
            x: Pid::new(x).map_err(|e| e.within("x"))?,
            y: Pid::new(y).map_err(|e| e.within("y"))?,
            z: Pid::new(z).map_err(|e| e.within("z"))?,
            roll_limit,
            pitch_limit,
            hover_throttle,
        })
    }

    /// Pitching forward moves along +x and rolling right moves along -y, so
    /// the y loop output is negated to get roll.
    pub(crate) fn calculate(&mut self, errors: &Vec3, yaw: f64, dt: f64) -> AttitudeCommand {
        let roll = (-self.y.update(errors.y, dt)).clamp(self.roll_limit[0], self.roll_limit[1]);
        let pitch = self
            .x
            .update(errors.x, dt)
            .clamp(self.pitch_limit[0], self.pitch_limit[1]);

        // compensate for the lift lost to tilt
        let tilt = (roll.cos() * pitch.cos()).abs().max(MIN_TILT_COS);
        let throttle = ((self.hover_throttle + self.z.update(errors.z, dt)) / tilt).clamp(0.0, 1.0);

        AttitudeCommand::new(roll, pitch, yaw, throttle)
    }

    pub(crate) fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }

    /// Seeds the previous error of the horizontal loops so the first
    /// derivative term after a hand-over is not a spike.
    pub(crate) fn prime(&mut self, errors: &Vec3) {
        self.x.prev_error = errors.x;
        self.y.prev_error = errors.y;
    }
}
