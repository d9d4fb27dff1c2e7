// awesomo_core/src/types.rs

use nalgebra::{UnitQuaternion, Vector3};

// --- Core Type Aliases ---
pub type Vec3 = Vector3<f64>;
pub type Quaternion = UnitQuaternion<f64>;

// =========================================================================
// == Vehicle Pose ==
// =========================================================================

/// Vehicle position and orientation in the local inertial (NWU) frame.
///
/// The orientation is stored as a `UnitQuaternion`, so it stays normalized
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quaternion::identity(),
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Builds a pose from a position and roll/pitch/yaw angles in radians.
    pub fn from_euler(position: Vec3, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            position,
            orientation: Quaternion::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Returns `(roll, pitch, yaw)` in radians (3-2-1 sequence).
    pub fn euler_angles(&self) -> (f64, f64, f64) {
        self.orientation.euler_angles()
    }

    pub fn yaw(&self) -> f64 {
        self.euler_angles().2
    }

    /// The roll/pitch part of the orientation, i.e. the rotation that takes a
    /// body-frame vector into the body-planar frame.
    pub fn tilt(&self) -> Quaternion {
        let (roll, pitch, _) = self.euler_angles();
        Quaternion::from_euler_angles(roll, pitch, 0.0)
    }
}

// =========================================================================
// == Target Observation ==
// =========================================================================

/// State of a camera gimbal at the time of a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalState {
    /// Gimbal position in the inertial frame.
    pub position: Vec3,
    /// Gimbal frame orientation in the inertial frame.
    pub frame: Quaternion,
    /// Gimbal joint orientation relative to the body-planar frame.
    pub joint: Quaternion,
}

/// One detection cycle from the vision pipeline.
///
/// `position` is expressed in the raw camera frame and is meaningless when
/// `detected` is false.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetObservation {
    pub position: Vec3,
    pub detected: bool,
    pub gimbal: Option<GimbalState>,
}

impl TargetObservation {
    pub fn detected(position: Vec3) -> Self {
        Self {
            position,
            detected: true,
            gimbal: None,
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn with_gimbal(mut self, gimbal: GimbalState) -> Self {
        self.gimbal = Some(gimbal);
        self
    }
}

// =========================================================================
// == Attitude Command ==
// =========================================================================

/// The output handed to the actuation collaborator every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeCommand {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    /// Normalized collective throttle in `[0, 1]`.
    pub throttle: f64,
    /// The same attitude expressed as a quaternion.
    pub orientation: Quaternion,
}

impl AttitudeCommand {
    pub fn new(roll: f64, pitch: f64, yaw: f64, throttle: f64) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            throttle,
            orientation: Quaternion::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Level attitude with zero thrust. Used whenever the vehicle is disarmed.
    pub fn neutral() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// `[roll, pitch, yaw, throttle]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.roll, self.pitch, self.yaw, self.throttle]
    }
}

impl Default for AttitudeCommand {
    fn default() -> Self {
        Self::neutral()
    }
}
