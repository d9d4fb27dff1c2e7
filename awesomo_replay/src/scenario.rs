// awesomo_replay/src/scenario.rs

//! Scenario files: what the vehicle and the detector report over time.
//!
//! A scenario is a TOML file. Any value can be overridden from the
//! environment with the `AWESOMO_` prefix and `__` as the section separator,
//! e.g. `AWESOMO_REPLAY__SEED=7`.

use std::path::{Path, PathBuf};

use awesomo_core::config::{ConfigError, QuadrotorConfig};
use awesomo_core::mission::MissionMode;
use awesomo_core::types::Vec3;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use nalgebra::Vector3;
use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] figment::Error),
    #[error("invalid scenario `{name}`: {reason}")]
    Invalid { name: String, reason: String },
    #[error("invalid vehicle configuration: {0}")]
    Vehicle(#[from] ConfigError),
}

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// The root of a scenario file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub replay: ReplaySettings,

    /// Parameters handed to `Quadrotor::configure`.
    #[serde(default)]
    pub vehicle: QuadrotorConfig,

    /// Optional route for Hover mode, inertial frame.
    #[serde(default)]
    pub waypoints: Vec<[f64; 3]>,

    /// Mode commanded right after configuring. The mission starts in Discover.
    #[serde(default)]
    pub start_mode: Option<MissionMode>,

    // The TOML has `[[phases]]`, which becomes a Vec of Phase structs.
    #[serde(default)]
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaySettings {
    pub name: String,
    /// Seed for the noise generator. Runs with the same seed are identical.
    pub seed: u64,
    /// Control period in seconds.
    pub dt: f64,
    /// Length of the replay in seconds.
    pub duration_seconds: f64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            seed: 0,
            dt: 0.05,
            duration_seconds: 30.0,
        }
    }
}

/// One stretch of the script. Positions are interpolated linearly from
/// `*_start` to `*_end` over `duration` seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Phase {
    pub duration: f64,
    /// Whether the detector sees the target during this phase.
    #[serde(default = "default_detected")]
    pub detected: bool,
    /// Target position in the inertial frame.
    #[serde(default)]
    pub target_start: [f64; 3],
    pub target_end: Option<[f64; 3]>,
    /// Vehicle position in the inertial frame.
    pub vehicle_start: [f64; 3],
    pub vehicle_end: Option<[f64; 3]>,
    /// Standard deviation of the noise added to each detection, meters.
    #[serde(default)]
    pub noise_stddev: f64,
    /// Chance that a detection in this phase is dropped.
    #[serde(default)]
    pub dropout_probability: f64,
}

fn default_detected() -> bool {
    true
}

impl Phase {
    pub fn target_start(&self) -> Vec3 {
        Vector3::from(self.target_start)
    }

    pub fn target_end(&self) -> Vec3 {
        Vector3::from(self.target_end.unwrap_or(self.target_start))
    }

    pub fn vehicle_start(&self) -> Vec3 {
        Vector3::from(self.vehicle_start)
    }

    pub fn vehicle_end(&self) -> Vec3 {
        Vector3::from(self.vehicle_end.unwrap_or(self.vehicle_start))
    }
}

impl ScenarioConfig {
    /// Loads a scenario file and applies `AWESOMO_` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.is_file() {
            return Err(ScenarioError::NotFound(path.to_path_buf()));
        }
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("AWESOMO_").split("__"));
        Self::from_figment(figment)
    }

    /// Parses a scenario from a TOML string, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ScenarioError> {
        Self::from_figment(Figment::from(Toml::string(toml)))
    }

    fn from_figment(figment: Figment) -> Result<Self, ScenarioError> {
        let scenario: ScenarioConfig = figment.extract()?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn waypoints(&self) -> Vec<Vec3> {
        self.waypoints.iter().copied().map(Vector3::from).collect()
    }

    fn invalid(&self, reason: impl Into<String>) -> ScenarioError {
        ScenarioError::Invalid {
            name: self.replay.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let replay = &self.replay;
        if !(replay.dt.is_finite() && replay.dt > 0.0) {
            return Err(self.invalid(format!("dt must be > 0, got {}", replay.dt)));
        }
        if !(replay.duration_seconds.is_finite() && replay.duration_seconds > 0.0) {
            return Err(self.invalid(format!(
                "duration_seconds must be > 0, got {}",
                replay.duration_seconds
            )));
        }
        if self.phases.is_empty() {
            return Err(self.invalid("at least one phase is required"));
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if !(phase.duration.is_finite() && phase.duration > 0.0) {
                return Err(self.invalid(format!("phases[{i}].duration must be > 0")));
            }
            if !(phase.noise_stddev.is_finite() && phase.noise_stddev >= 0.0) {
                return Err(self.invalid(format!("phases[{i}].noise_stddev must be >= 0")));
            }
            if !(0.0..=1.0).contains(&phase.dropout_probability) {
                return Err(self.invalid(format!(
                    "phases[{i}].dropout_probability must be within [0, 1]"
                )));
            }
        }
        self.vehicle.validate()?;
        Ok(())
    }
}

/// Every `.toml` file under `path`, sorted, or `path` itself when it is a
/// file.
pub fn discover_scenarios(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "toml")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [replay]
        name = "minimal"
        seed = 3
        dt = 0.1
        duration_seconds = 2.0

        [[phases]]
        duration = 2.0
        vehicle_start = [0.0, 0.0, 3.0]
    "#;

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(scenario.replay.seed, 3);
        assert_eq!(scenario.vehicle, QuadrotorConfig::default());
        assert_eq!(scenario.start_mode, None);

        let phase = &scenario.phases[0];
        assert!(phase.detected);
        assert_eq!(phase.vehicle_end(), phase.vehicle_start());
        assert_eq!(phase.target_end(), Vec3::zeros());
    }

    #[test]
    fn test_vehicle_overrides_and_start_mode() {
        // top-level keys must come before the first table
        let toml = format!(
            "start_mode = \"hover\"\n{MINIMAL}\n[vehicle.mission]\nmin_track_time = 2.5\n"
        );

        let scenario = ScenarioConfig::from_toml_str(&toml).unwrap();
        assert_eq!(scenario.start_mode, Some(MissionMode::Hover));
        assert_eq!(scenario.vehicle.mission.min_track_time, 2.5);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let toml = format!("{MINIMAL}\nbogus = 1\n");
        assert!(matches!(
            ScenarioConfig::from_toml_str(&toml),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_dropout_probability() {
        let toml = format!("{MINIMAL}\ndropout_probability = 1.5\n");
        assert!(matches!(
            ScenarioConfig::from_toml_str(&toml),
            Err(ScenarioError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::load(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ScenarioError::NotFound(_)));
    }
}
