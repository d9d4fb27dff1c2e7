// awesomo_core/src/prelude.rs

// --- Core Data Structures ---
pub use crate::types::{AttitudeCommand, GimbalState, Pose, Quaternion, TargetObservation, Vec3};

// --- Configuration ---
pub use crate::config::{ConfigError, MotionModel, QuadrotorConfig};

// --- Time ---
pub use crate::clock::{Clock, ManualClock, SystemClock};

// --- Estimation ---
pub use crate::estimation::{EstimationError, KalmanFilter, TransitionModel};

// --- Control ---
pub use crate::control::{CarrotFollower, Pid, RouteError, RouteStatus};

// --- Mission ---
pub use crate::mission::{
    MissionError, MissionMode, Quadrotor, StepOutcome, Transition, TransitionReason,
};
pub use crate::tracking::LandingTarget;
