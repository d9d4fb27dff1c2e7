// awesomo_core/src/mission/transitions.rs

//! The mission transition table.
//!
//! Automatic transitions are a pure function of the current mode and a
//! snapshot of the guard inputs, so the table can be tested without a
//! running sequencer.

use super::{MissionError, MissionMode, Transition, TransitionReason};
use crate::config::MissionConfig;

/// Inputs the automatic transitions depend on, sampled once per step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Guards {
    /// The target was detected in the most recent observation.
    pub detected: bool,
    /// The target has not been seen for longer than the lost threshold.
    pub losted: bool,
    /// Seconds spent in the current mode, `None` while the mode timer is unset.
    pub mode_elapsed: Option<f64>,
    /// Cycles spent inside the landing zone since landing started.
    pub landing_belief: u32,
    /// The loaded waypoint route reached its last point.
    pub route_finished: bool,
}

impl Guards {
    fn target_in_view(&self) -> bool {
        self.detected && !self.losted
    }

    fn elapsed_beyond(&self, min: f64) -> bool {
        self.mode_elapsed.is_some_and(|elapsed| elapsed > min)
    }
}

/// The automatic transition out of `mode`, if any guard fires.
pub fn next_mode(mode: MissionMode, guards: &Guards, config: &MissionConfig) -> Option<Transition> {
    use MissionMode::*;

    let (to, reason) = match mode {
        Discover if guards.target_in_view() && guards.elapsed_beyond(config.min_discover_time) => {
            (Track, TransitionReason::TargetAcquired)
        }
        Track if guards.target_in_view() && guards.elapsed_beyond(config.min_track_time) => {
            (Land, TransitionReason::TrackingSettled)
        }
        Track if guards.losted => (Discover, TransitionReason::TargetLost),
        Land if guards.landing_belief >= config.landing.belief_threshold => {
            (Disarm, TransitionReason::Landed)
        }
        Land if guards.losted => (Discover, TransitionReason::TargetLost),
        Hover if guards.route_finished => (Accomplished, TransitionReason::RouteComplete),
        _ => return None,
    };
    Some(Transition::new(mode, to, reason))
}

/// Checks an externally requested mode change.
///
/// Allowed: any non-terminal mode to Hover, any mode to Disarm, and Hover
/// back to Discover.
pub fn command_transition(from: MissionMode, to: MissionMode) -> Result<Transition, MissionError> {
    let allowed = match to {
        MissionMode::Disarm => true,
        MissionMode::Hover => !from.is_terminal(),
        MissionMode::Discover => from == MissionMode::Hover,
        _ => false,
    };
    if allowed {
        Ok(Transition::new(from, to, TransitionReason::Commanded))
    } else {
        Err(MissionError::InvalidCommand { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MissionMode::*;

    fn config() -> MissionConfig {
        let mut config = MissionConfig {
            min_discover_time: 2.0,
            min_track_time: 5.0,
            ..Default::default()
        };
        config.landing.belief_threshold = 5;
        config
    }

    fn in_view(elapsed: Option<f64>) -> Guards {
        Guards {
            detected: true,
            losted: false,
            mode_elapsed: elapsed,
            ..Default::default()
        }
    }

    #[test]
    fn test_discover_waits_for_min_time() {
        let c = config();
        assert_eq!(next_mode(Discover, &in_view(None), &c), None);
        assert_eq!(next_mode(Discover, &in_view(Some(2.0)), &c), None);

        let t = next_mode(Discover, &in_view(Some(2.01)), &c).unwrap();
        assert_eq!((t.to, t.reason), (Track, TransitionReason::TargetAcquired));
    }

    #[test]
    fn test_discover_needs_target_in_view() {
        let c = config();
        let mut guards = in_view(Some(10.0));
        guards.detected = false;
        assert_eq!(next_mode(Discover, &guards, &c), None);

        guards.detected = true;
        guards.losted = true;
        assert_eq!(next_mode(Discover, &guards, &c), None);
    }

    #[test]
    fn test_track_lands_or_reverts() {
        let c = config();
        let t = next_mode(Track, &in_view(Some(5.5)), &c).unwrap();
        assert_eq!(t.to, Land);

        let lost = Guards {
            losted: true,
            mode_elapsed: Some(5.5),
            ..Default::default()
        };
        let t = next_mode(Track, &lost, &c).unwrap();
        assert_eq!((t.to, t.reason), (Discover, TransitionReason::TargetLost));

        // missed one frame but still tracked
        let blink = Guards {
            mode_elapsed: Some(1.0),
            ..Default::default()
        };
        assert_eq!(next_mode(Track, &blink, &c), None);
    }

    #[test]
    fn test_land_disarms_on_belief() {
        let c = config();
        let mut guards = in_view(None);
        guards.landing_belief = 4;
        assert_eq!(next_mode(Land, &guards, &c), None);

        guards.landing_belief = 5;
        let t = next_mode(Land, &guards, &c).unwrap();
        assert_eq!((t.to, t.reason), (Disarm, TransitionReason::Landed));

        let lost = Guards {
            losted: true,
            ..Default::default()
        };
        assert_eq!(next_mode(Land, &lost, &c).map(|t| t.to), Some(Discover));
    }

    #[test]
    fn test_terminal_modes_have_no_automatic_exit() {
        let c = config();
        let everything = Guards {
            detected: true,
            losted: true,
            mode_elapsed: Some(100.0),
            landing_belief: 100,
            route_finished: true,
        };
        assert_eq!(next_mode(Disarm, &everything, &c), None);
        assert_eq!(next_mode(Accomplished, &everything, &c), None);
        assert_eq!(next_mode(Hover, &everything, &c).map(|t| t.to), Some(Accomplished));
    }

    #[test]
    fn test_commands() {
        assert!(command_transition(Track, Hover).is_ok());
        assert!(command_transition(Land, Disarm).is_ok());
        assert!(command_transition(Accomplished, Disarm).is_ok());
        assert!(command_transition(Hover, Discover).is_ok());

        assert_eq!(
            command_transition(Disarm, Hover),
            Err(MissionError::InvalidCommand { from: Disarm, to: Hover })
        );
        assert!(command_transition(Discover, Land).is_err());
        assert!(command_transition(Track, Discover).is_err());
        assert!(command_transition(Hover, Accomplished).is_err());
    }
}
