// awesomo_replay/src/runner.rs

//! Drives a [`Quadrotor`] through a scenario on a manual clock and collects
//! what happened.

use std::fs;
use std::io;
use std::path::Path;

use awesomo_core::clock::ManualClock;
use awesomo_core::mission::{MissionError, MissionMode, Quadrotor};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scenario::{ScenarioConfig, ScenarioError};
use crate::script::ScriptedFeed;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("mission error: {0}")]
    Mission(#[from] MissionError),
    #[error("failed to serialize report: {0}")]
    Report(#[from] toml::ser::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// One mode change observed during a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    /// Replay time in seconds.
    pub time: f64,
    pub from: String,
    pub to: String,
    pub reason: String,
}

/// The outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub name: String,
    pub seed: u64,
    pub steps: u64,
    pub final_mode: String,
    /// Steps with a detection handed to the sequencer.
    pub detections: u64,
    /// Detections dropped by the scripted detector.
    pub dropouts: u64,
    pub target_losses: u32,
    pub landing_belief: u32,
    pub min_throttle: f64,
    pub max_throttle: f64,
    /// Last inertial target estimate, if the tracker ever saw the target.
    pub target_estimate: Option<[f64; 3]>,
    pub transitions: Vec<TransitionRecord>,
}

impl ReplaySummary {
    /// The mode the replay ended in, parsed back from its name.
    pub fn final_mode(&self) -> Option<MissionMode> {
        MissionMode::from_name(&self.final_mode)
    }
}

#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    scenarios: &'a [ReplaySummary],
}

/// Replays `scenario` from start to finish.
///
/// The run stops early once the vehicle disarms, since nothing can leave
/// Disarm without a command.
pub fn run_scenario(scenario: &ScenarioConfig) -> Result<ReplaySummary, ReplayError> {
    scenario.validate()?;
    let replay = &scenario.replay;

    let clock = ManualClock::new();
    let mut quad = Quadrotor::with_clock(clock.clone());
    quad.configure(scenario.vehicle)?;

    let waypoints = scenario.waypoints();
    if !waypoints.is_empty() {
        quad.load_waypoints(&waypoints)?;
    }
    if let Some(mode) = scenario.start_mode {
        quad.set_mode(mode)?;
    }

    let mut feed = ScriptedFeed::new(scenario)?;
    let total_steps = (replay.duration_seconds / replay.dt).round() as u64;
    info!(
        scenario = %replay.name,
        seed = replay.seed,
        steps = total_steps,
        "starting replay"
    );

    let mut steps = 0;
    let mut transitions = Vec::new();
    let mut detections = 0;
    let mut dropouts = 0;
    let mut min_throttle = f64::INFINITY;
    let mut max_throttle = f64::NEG_INFINITY;

    for k in 0..total_steps {
        let time = k as f64 * replay.dt;
        let Some(sample) = feed.sample(time) else {
            break;
        };
        if sample.observation.detected {
            detections += 1;
        }
        if sample.dropped {
            dropouts += 1;
        }

        quad.set_pose(sample.pose)?;
        quad.set_velocity(sample.velocity)?;
        quad.set_target_observation(sample.observation)?;
        let outcome = quad.step(replay.dt)?;
        clock.advance_secs(replay.dt);
        steps += 1;

        min_throttle = min_throttle.min(outcome.command.throttle);
        max_throttle = max_throttle.max(outcome.command.throttle);

        if let Some(transition) = outcome.transition {
            debug!(time, from = %transition.from, to = %transition.to, "transition");
            transitions.push(TransitionRecord {
                time,
                from: transition.from.to_string(),
                to: transition.to.to_string(),
                reason: format!("{:?}", transition.reason),
            });
        }
        if outcome.mode == MissionMode::Disarm {
            break;
        }
    }

    if steps == 0 {
        warn!(scenario = %replay.name, "replay produced no steps");
        min_throttle = 0.0;
        max_throttle = 0.0;
    }

    let final_mode = quad.mode().unwrap_or_default();
    Ok(ReplaySummary {
        name: replay.name.clone(),
        seed: replay.seed,
        steps,
        final_mode: final_mode.to_string(),
        detections,
        dropouts,
        target_losses: quad.target_losses().unwrap_or_default(),
        landing_belief: quad.landing_belief().unwrap_or_default(),
        min_throttle,
        max_throttle,
        target_estimate: quad.target_inertial_position().map(Into::into),
        transitions,
    })
}

/// Writes every summary to `path` as one TOML document.
pub fn write_report(path: &Path, summaries: &[ReplaySummary]) -> Result<(), ReplayError> {
    let report = toml::to_string_pretty(&ReplayReport {
        scenarios: summaries,
    })?;
    fs::write(path, report)?;
    info!(path = %path.display(), scenarios = summaries.len(), "report written");
    Ok(())
}
