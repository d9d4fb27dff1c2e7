// awesomo_core/src/tracking/frames.rs

//! Coordinate frames a target position passes through.
//!
//! * camera frame: raw detector output.
//! * body frame: fixed to the airframe, NWU.
//! * body-planar frame: body frame with roll and pitch removed, so x/y lie in
//!   the horizontal plane and z is straight up. The controllers work here.
//! * inertial frame: local NWU world frame.

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::CameraMountConfig;
use crate::types::{Quaternion, Vec3};

/// Fixed transform from the camera frame into the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMount {
    pub rotation: Quaternion,
    pub offset: Vec3,
}

impl Default for CameraMount {
    fn default() -> Self {
        Self {
            rotation: Quaternion::identity(),
            offset: Vec3::zeros(),
        }
    }
}

impl From<CameraMountConfig> for CameraMount {
    fn from(config: CameraMountConfig) -> Self {
        Self {
            rotation: config.rotation(),
            offset: config.offset(),
        }
    }
}

impl CameraMount {
    pub fn to_body(&self, target_cf: &Vec3) -> Vec3 {
        self.rotation * target_cf + self.offset
    }
}

/// Camera-frame target position to the body-planar frame.
///
/// `tilt` is the roll/pitch attitude of whatever the camera is attached to:
/// the gimbal joint when there is one, else the vehicle body.
pub fn target_in_body_planar(mount: &CameraMount, target_cf: &Vec3, tilt: &Quaternion) -> Vec3 {
    tilt * mount.to_body(target_cf)
}

/// Body-planar target position to the inertial frame.
///
/// Only the heading of `frame` is used; the body-planar frame has no roll or
/// pitch left to undo.
pub fn target_in_inertial(target_bpf: &Vec3, origin: &Vec3, frame: &Quaternion) -> Vec3 {
    let (_, _, yaw) = frame.euler_angles();
    let heading = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
    heading * target_bpf + origin
}
