// awesomo_core/src/mission/mod.rs

//! The discover → track → land mission sequencer.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::control::RouteError;
use crate::estimation::EstimationError;

pub mod quadrotor;
pub mod transitions;

pub use quadrotor::{Quadrotor, StepOutcome};
pub use transitions::{command_transition, next_mode, Guards};

/// Mission modes. The discriminants are the codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MissionMode {
    /// Motors off. Nothing leaves this mode except a reconfigure.
    Disarm = 0,
    /// Hold a position, or follow a waypoint route when one is loaded.
    Hover = 1,
    /// Hold the hover position and wait for the target to settle in view.
    #[default]
    Discover = 2,
    /// Keep the vehicle above the target.
    Track = 3,
    /// Descend onto the target.
    Land = 4,
    /// Route finished. Holds the last waypoint.
    Accomplished = 5,
}

impl MissionMode {
    pub const ALL: [MissionMode; 6] = [
        MissionMode::Disarm,
        MissionMode::Hover,
        MissionMode::Discover,
        MissionMode::Track,
        MissionMode::Land,
        MissionMode::Accomplished,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Modes the sequencer never leaves on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionMode::Disarm | MissionMode::Accomplished)
    }

    pub fn name(self) -> &'static str {
        match self {
            MissionMode::Disarm => "DISARM",
            MissionMode::Hover => "HOVER",
            MissionMode::Discover => "DISCOVER",
            MissionMode::Track => "TRACK",
            MissionMode::Land => "LAND",
            MissionMode::Accomplished => "ACCOMPLISHED",
        }
    }

    /// Looks a mode up by its display name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        MissionMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for MissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for MissionMode {
    type Error = MissionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MissionMode::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or(MissionError::InvalidMode(code))
    }
}

/// Why the sequencer changed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Discover → Track.
    TargetAcquired,
    /// Track → Land.
    TrackingSettled,
    /// Land → Disarm.
    Landed,
    /// Track/Land → Discover.
    TargetLost,
    /// Hover → Accomplished.
    RouteComplete,
    /// Requested through `set_mode`.
    Commanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MissionMode,
    pub to: MissionMode,
    pub reason: TransitionReason,
}

impl Transition {
    pub fn new(from: MissionMode, to: MissionMode, reason: TransitionReason) -> Self {
        Self { from, to, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("quadrotor used before configure")]
    NotConfigured,
    #[error("unknown mission mode code {0}")]
    InvalidMode(u8),
    #[error("cannot switch from {from} to {to} on command")]
    InvalidCommand { from: MissionMode, to: MissionMode },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid waypoint route: {0}")]
    Route(#[from] RouteError),
    #[error("target estimator failed: {0}")]
    Estimation(#[from] EstimationError),
}
