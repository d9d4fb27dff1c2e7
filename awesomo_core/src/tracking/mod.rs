// awesomo_core/src/tracking/mod.rs

//! Target tracking: frame transforms and the landing target estimator.

pub mod frames;
pub mod landing_target;

pub use frames::{target_in_body_planar, target_in_inertial, CameraMount};
pub use landing_target::LandingTarget;
