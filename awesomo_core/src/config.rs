// awesomo_core/src/config.rs

//! Parameter structs for every component of the core.
//!
//! These are plain data: the core never reads files. A front-end (see
//! `awesomo_replay`) deserializes them with serde and hands them over at
//! configure time. Every struct has a `validate` method that is run before a
//! component accepts it.

use nalgebra::Vector3;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{Quaternion, Vec3};

// =========================================================================
// == Errors ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefixes the offending field with the name of the enclosing section.
    pub fn within(self, section: &str) -> Self {
        match self {
            ConfigError::Invalid { field, reason } => ConfigError::Invalid {
                field: format!("{section}.{field}"),
                reason,
            },
        }
    }
}

fn ensure_finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite")))
    }
}

fn ensure_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be >= 0")));
    }
    Ok(())
}

fn ensure_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    ensure_finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::invalid(field, format!("{value} must be > 0")));
    }
    Ok(())
}

fn ensure_range(field: &str, range: [f64; 2]) -> Result<(), ConfigError> {
    ensure_finite(field, range[0])?;
    ensure_finite(field, range[1])?;
    if range[0] > range[1] {
        return Err(ConfigError::invalid(
            field,
            format!("min {} is greater than max {}", range[0], range[1]),
        ));
    }
    Ok(())
}

// =========================================================================
// == Controllers ==
// =========================================================================

/// Gains and limits of a single PID loop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PidConfig {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Errors with a magnitude below this are treated as zero.
    pub dead_zone: f64,
    /// Symmetric bound on the integral term. When absent the bound is derived
    /// from the output range so `k_i * integral` can never exceed it.
    pub integral_limit: Option<f64>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            k_p: 0.0,
            k_i: 0.0,
            k_d: 0.0,
            output_min: -1.0,
            output_max: 1.0,
            dead_zone: 0.0,
            integral_limit: None,
        }
    }
}

impl PidConfig {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            ..Default::default()
        }
    }

    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    pub fn with_dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = dead_zone;
        self
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("k_p", self.k_p)?;
        ensure_non_negative("k_i", self.k_i)?;
        ensure_non_negative("k_d", self.k_d)?;
        ensure_range("output", [self.output_min, self.output_max])?;
        ensure_non_negative("dead_zone", self.dead_zone)?;
        if let Some(limit) = self.integral_limit {
            ensure_positive("integral_limit", limit)?;
        }
        Ok(())
    }
}

fn validate_attitude_loops(
    axes: [(&str, &PidConfig); 3],
    roll_limit: [f64; 2],
    pitch_limit: [f64; 2],
    hover_throttle: f64,
) -> Result<(), ConfigError> {
    for (name, pid) in axes {
        pid.validate().map_err(|e| e.within(name))?;
    }
    ensure_range("roll_limit", roll_limit)?;
    ensure_range("pitch_limit", pitch_limit)?;
    ensure_finite("hover_throttle", hover_throttle)?;
    if !(0.0..=1.0).contains(&hover_throttle) {
        return Err(ConfigError::invalid(
            "hover_throttle",
            format!("{hover_throttle} is outside [0, 1]"),
        ));
    }
    Ok(())
}

fn default_xy_loop() -> PidConfig {
    PidConfig::new(0.3, 0.0, 0.12).with_output_limits(-0.5, 0.5)
}

fn default_z_loop() -> PidConfig {
    PidConfig::new(0.4, 0.05, 0.15).with_output_limits(-0.5, 0.5)
}

const DEFAULT_TILT_LIMIT: [f64; 2] = [-0.35, 0.35];

/// Position (hover) controller parameters. Limits are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PositionControllerConfig {
    pub x: PidConfig,
    pub y: PidConfig,
    pub z: PidConfig,
    pub roll_limit: [f64; 2],
    pub pitch_limit: [f64; 2],
    pub hover_throttle: f64,
}

impl Default for PositionControllerConfig {
    fn default() -> Self {
        Self {
            x: default_xy_loop(),
            y: default_xy_loop(),
            z: default_z_loop(),
            roll_limit: DEFAULT_TILT_LIMIT,
            pitch_limit: DEFAULT_TILT_LIMIT,
            hover_throttle: 0.5,
        }
    }
}

impl PositionControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_attitude_loops(
            [("x", &self.x), ("y", &self.y), ("z", &self.z)],
            self.roll_limit,
            self.pitch_limit,
            self.hover_throttle,
        )
    }
}

/// Target tracking controller parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrackingControllerConfig {
    pub x: PidConfig,
    pub y: PidConfig,
    pub z: PidConfig,
    pub roll_limit: [f64; 2],
    pub pitch_limit: [f64; 2],
    pub hover_throttle: f64,
    /// Weight of the velocity error added to the position error on every axis.
    pub velocity_gain: f64,
}

impl Default for TrackingControllerConfig {
    fn default() -> Self {
        Self {
            x: default_xy_loop(),
            y: default_xy_loop(),
            z: default_z_loop(),
            roll_limit: DEFAULT_TILT_LIMIT,
            pitch_limit: DEFAULT_TILT_LIMIT,
            hover_throttle: 0.5,
            velocity_gain: 0.5,
        }
    }
}

impl TrackingControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_attitude_loops(
            [("x", &self.x), ("y", &self.y), ("z", &self.z)],
            self.roll_limit,
            self.pitch_limit,
            self.hover_throttle,
        )?;
        ensure_non_negative("velocity_gain", self.velocity_gain)
    }
}

/// Landing controller parameters: tracking plus a commanded descent rate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LandingControllerConfig {
    pub x: PidConfig,
    pub y: PidConfig,
    pub z: PidConfig,
    pub roll_limit: [f64; 2],
    pub pitch_limit: [f64; 2],
    pub hover_throttle: f64,
    pub velocity_gain: f64,
    /// Descent speed in m/s (positive down).
    pub descent_rate: f64,
}

impl Default for LandingControllerConfig {
    fn default() -> Self {
        Self {
            x: default_xy_loop(),
            y: default_xy_loop(),
            z: default_z_loop(),
            roll_limit: DEFAULT_TILT_LIMIT,
            pitch_limit: DEFAULT_TILT_LIMIT,
            hover_throttle: 0.5,
            velocity_gain: 0.5,
            descent_rate: 0.2,
        }
    }
}

impl LandingControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_attitude_loops(
            [("x", &self.x), ("y", &self.y), ("z", &self.z)],
            self.roll_limit,
            self.pitch_limit,
            self.hover_throttle,
        )?;
        ensure_non_negative("velocity_gain", self.velocity_gain)?;
        ensure_non_negative("descent_rate", self.descent_rate)
    }
}

/// Carrot-chasing path follower parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CarrotConfig {
    /// Lookahead distance `r` in meters.
    pub look_ahead_dist: f64,
    /// Distance at which a waypoint counts as reached.
    pub wp_threshold: f64,
}

impl Default for CarrotConfig {
    fn default() -> Self {
        Self {
            look_ahead_dist: 1.0,
            wp_threshold: 0.3,
        }
    }
}

impl CarrotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("look_ahead_dist", self.look_ahead_dist)?;
        ensure_positive("wp_threshold", self.wp_threshold)
    }
}

// =========================================================================
// == Target Tracking ==
// =========================================================================

/// Motion model used to propagate the target estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionModel {
    ConstantVelocity,
    #[default]
    ConstantAcceleration,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EstimatorConfig {
    pub motion_model: MotionModel,
    /// Intensity of the white-noise term driving the highest derivative.
    pub process_noise: f64,
    /// Per-axis variance of a position measurement.
    pub measurement_noise: [f64; 3],
    /// Diagonal of the covariance the filter starts from.
    pub initial_covariance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            motion_model: MotionModel::ConstantAcceleration,
            process_noise: 0.5,
            measurement_noise: [0.05, 0.05, 0.05],
            initial_covariance: 1.0,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("process_noise", self.process_noise)?;
        for value in self.measurement_noise {
            ensure_non_negative("measurement_noise", value)?;
        }
        ensure_positive("initial_covariance", self.initial_covariance)
    }
}

/// Fixed pose of the camera relative to the vehicle body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CameraMountConfig {
    /// Camera position in the body frame, meters.
    pub offset: [f64; 3],
    /// Camera roll, pitch, yaw relative to the body frame, radians.
    pub rpy: [f64; 3],
}

impl CameraMountConfig {
    pub fn offset(&self) -> Vec3 {
        Vector3::from(self.offset)
    }

    pub fn rotation(&self) -> Quaternion {
        Quaternion::from_euler_angles(self.rpy[0], self.rpy[1], self.rpy[2])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for value in self.offset {
            ensure_finite("offset", value)?;
        }
        for value in self.rpy {
            ensure_finite("rpy", value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TargetConfig {
    /// Seconds without a detection after which the target counts as lost.
    pub lost_threshold: f64,
    pub camera_mount: CameraMountConfig,
    pub estimator: EstimatorConfig,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            lost_threshold: 1.0,
            camera_mount: CameraMountConfig::default(),
            estimator: EstimatorConfig::default(),
        }
    }
}

impl TargetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("lost_threshold", self.lost_threshold)?;
        self.camera_mount
            .validate()
            .map_err(|e| e.within("camera_mount"))?;
        self.estimator.validate().map_err(|e| e.within("estimator"))
    }
}

// =========================================================================
// == Mission ==
// =========================================================================

/// Landing behaviour parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LandingConfig {
    /// Seconds between landing height updates.
    pub period: f64,
    /// Factor applied to the landing height while centred over the target.
    pub descend_multiplier: f64,
    /// Factor applied to the landing height while off-centre.
    pub recover_multiplier: f64,
    /// Landing zone half-extent on x, y and z.
    pub cutoff_position: [f64; 3],
    /// Cycles inside the landing zone required before disarming.
    pub belief_threshold: u32,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            period: 1.0,
            descend_multiplier: 0.8,
            recover_multiplier: 1.2,
            cutoff_position: [0.2, 0.2, 0.3],
            belief_threshold: 20,
        }
    }
}

impl LandingConfig {
    pub fn cutoff(&self) -> Vec3 {
        Vector3::from(self.cutoff_position)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("period", self.period)?;
        ensure_positive("descend_multiplier", self.descend_multiplier)?;
        ensure_positive("recover_multiplier", self.recover_multiplier)?;
        for value in self.cutoff_position {
            ensure_positive("cutoff_position", value)?;
        }
        if self.belief_threshold < 1 {
            return Err(ConfigError::invalid("belief_threshold", "must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MissionConfig {
    /// Initial hover setpoint in the inertial frame.
    pub hover_position: [f64; 3],
    /// Yaw setpoint in radians.
    pub heading: f64,
    /// Seconds the target must stay in view before tracking starts.
    pub min_discover_time: f64,
    /// Seconds of tracking before the descent starts.
    pub min_track_time: f64,
    pub landing: LandingConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            hover_position: [0.0, 0.0, 3.0],
            heading: 0.0,
            min_discover_time: 1.0,
            min_track_time: 5.0,
            landing: LandingConfig::default(),
        }
    }
}

impl MissionConfig {
    pub fn hover_position(&self) -> Vec3 {
        Vector3::from(self.hover_position)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for value in self.hover_position {
            ensure_finite("hover_position", value)?;
        }
        ensure_finite("heading", self.heading)?;
        ensure_non_negative("min_discover_time", self.min_discover_time)?;
        ensure_non_negative("min_track_time", self.min_track_time)?;
        self.landing.validate().map_err(|e| e.within("landing"))
    }
}

/// Everything the mission sequencer needs, grouped per component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QuadrotorConfig {
    pub position_controller: PositionControllerConfig,
    pub tracking_controller: TrackingControllerConfig,
    pub landing_controller: LandingControllerConfig,
    pub carrot: CarrotConfig,
    pub target: TargetConfig,
    pub mission: MissionConfig,
}

impl QuadrotorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.position_controller
            .validate()
            .map_err(|e| e.within("position_controller"))?;
        self.tracking_controller
            .validate()
            .map_err(|e| e.within("tracking_controller"))?;
        self.landing_controller
            .validate()
            .map_err(|e| e.within("landing_controller"))?;
        self.carrot.validate().map_err(|e| e.within("carrot"))?;
        self.target.validate().map_err(|e| e.within("target"))?;
        self.mission.validate().map_err(|e| e.within("mission"))
    }
}
