// awesomo_replay/src/script.rs

//! Turns a scenario's phases into the per-step inputs of the sequencer:
//! vehicle pose and velocity, and what the downward camera reports.

use awesomo_core::tracking::CameraMount;
use awesomo_core::types::{Pose, Quaternion, TargetObservation, Vec3};
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::scenario::{Phase, ScenarioConfig, ScenarioError};

/// Everything the vehicle's sensors report at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub pose: Pose,
    pub velocity: Vec3,
    pub observation: TargetObservation,
    /// The target was visible but the detection was dropped.
    pub dropped: bool,
}

/// The ground truth for one instant, before any sensor effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthSample {
    pub vehicle: Vec3,
    pub velocity: Vec3,
    pub target: Vec3,
    pub visible: bool,
}

struct ScriptedPhase {
    phase: Phase,
    start_time: f64,
    noise: Option<Normal<f64>>,
}

/// A seeded, replayable sensor feed.
pub struct ScriptedFeed {
    phases: Vec<ScriptedPhase>,
    mount: CameraMount,
    heading: f64,
    rng: ChaCha8Rng,
}

impl ScriptedFeed {
    pub fn new(scenario: &ScenarioConfig) -> Result<Self, ScenarioError> {
        let mut start_time = 0.0;
        let mut phases = Vec::with_capacity(scenario.phases.len());
        for (i, phase) in scenario.phases.iter().enumerate() {
            let noise = if phase.noise_stddev > 0.0 {
                let dist = Normal::new(0.0, phase.noise_stddev).map_err(|e| {
                    ScenarioError::Invalid {
                        name: scenario.replay.name.clone(),
                        reason: format!("phases[{i}].noise_stddev: {e}"),
                    }
                })?;
                Some(dist)
            } else {
                None
            };
            phases.push(ScriptedPhase {
                phase: phase.clone(),
                start_time,
                noise,
            });
            start_time += phase.duration;
        }

        Ok(Self {
            phases,
            mount: CameraMount::from(scenario.vehicle.target.camera_mount),
            heading: scenario.vehicle.mission.heading,
            rng: ChaCha8Rng::seed_from_u64(scenario.replay.seed),
        })
    }

    fn phase_at(&self, t: f64) -> Option<(&ScriptedPhase, f64)> {
        let current = self
            .phases
            .iter()
            .rev()
            .find(|p| t >= p.start_time)
            .or_else(|| self.phases.first())?;
        let fraction = ((t - current.start_time) / current.phase.duration).clamp(0.0, 1.0);
        Some((current, fraction))
    }

    /// Ground truth at time `t`. Past the last phase its end state is held.
    pub fn truth(&self, t: f64) -> Option<TruthSample> {
        let (current, s) = self.phase_at(t)?;
        let phase = &current.phase;
        let travel = phase.vehicle_end() - phase.vehicle_start();
        let velocity = if s < 1.0 {
            travel / phase.duration
        } else {
            Vec3::zeros()
        };
        Some(TruthSample {
            vehicle: phase.vehicle_start() + travel * s,
            velocity,
            target: phase.target_start().lerp(&phase.target_end(), s),
            visible: phase.detected,
        })
    }

    /// Sensor readings at time `t`. Draws from the noise generator, so the
    /// sequence of calls must be the same for two runs to match.
    pub fn sample(&mut self, t: f64) -> Option<Sample> {
        let truth = self.truth(t)?;
        let (noise, dropout) = {
            let (current, _) = self.phase_at(t)?;
            (current.noise, current.phase.dropout_probability)
        };

        let pose = Pose::from_euler(truth.vehicle, 0.0, 0.0, self.heading);
        let mut dropped = false;
        let observation = if !truth.visible {
            TargetObservation::missing()
        } else if dropout > 0.0 && self.rng.gen_bool(dropout) {
            dropped = true;
            TargetObservation::missing()
        } else {
            let mut position = self.camera_frame(&pose, &truth.target);
            if let Some(noise) = noise {
                position += Vector3::new(
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                );
            }
            TargetObservation::detected(position)
        };

        Some(Sample {
            pose,
            velocity: truth.velocity,
            observation,
            dropped,
        })
    }

    /// Where a camera on `pose` sees an inertial point.
    pub fn camera_frame(&self, pose: &Pose, target: &Vec3) -> Vec3 {
        let heading = Quaternion::from_euler_angles(0.0, 0.0, pose.yaw());
        let body_planar = heading.inverse() * (target - pose.position);
        let body = pose.tilt().inverse() * body_planar;
        self.mount.rotation.inverse() * (body - self.mount.offset)
    }
}
