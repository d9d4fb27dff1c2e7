// awesomo_core/tests/mission_scenarios.rs

use approx::assert_abs_diff_eq;
use awesomo_core::prelude::*;

const DT: f64 = 0.1;

fn quadrotor(config: QuadrotorConfig) -> (Quadrotor, ManualClock) {
    let clock = ManualClock::new();
    let mut quad = Quadrotor::with_clock(clock.clone());
    quad.configure(config).unwrap();
    quad.set_pose(Pose::new(Vec3::new(0.0, 0.0, 2.0), Quaternion::identity()))
        .unwrap();
    (quad, clock)
}

/// Feeds `observation`, steps once and advances the clock by `DT`.
fn tick(quad: &mut Quadrotor, clock: &ManualClock, observation: TargetObservation) -> StepOutcome {
    quad.set_target_observation(observation).unwrap();
    let outcome = quad.step(DT).unwrap();
    clock.advance_secs(DT);
    outcome
}

fn quick_config() -> QuadrotorConfig {
    let mut config = QuadrotorConfig::default();
    config.mission.min_discover_time = 0.0;
    config.mission.min_track_time = 0.0;
    config
}

/// Runs Discover -> Track -> Land with the target slightly off-centre.
fn drive_to_land(quad: &mut Quadrotor, clock: &ManualClock) {
    let off_centre = TargetObservation::detected(Vec3::new(0.5, 0.0, -2.0));
    for _ in 0..10 {
        tick(quad, clock, off_centre);
        if quad.mode() == Some(MissionMode::Land) {
            return;
        }
    }
    panic!("never reached Land, stuck in {:?}", quad.mode());
}

#[test]
fn discover_switches_to_track_only_after_min_time() {
    let mut config = QuadrotorConfig::default();
    config.mission.min_discover_time = 2.0;
    let (mut quad, clock) = quadrotor(config);
    let seen = TargetObservation::detected(Vec3::new(0.1, 0.0, -2.0));

    let mut switched_at = Vec::new();
    for k in 0..=25 {
        let outcome = tick(&mut quad, &clock, seen);
        if let Some(transition) = outcome.transition {
            assert_eq!(transition.reason, TransitionReason::TargetAcquired);
            switched_at.push(k);
        }
    }

    // the timer starts on the first step, so step k sees k * DT seconds
    assert_eq!(switched_at, vec![21]);
    assert_eq!(quad.mode(), Some(MissionMode::Track));
}

#[test]
fn lost_target_reverts_track_to_discover() {
    let mut config = quick_config();
    config.mission.min_track_time = 100.0;
    config.target.lost_threshold = 1.0;
    let (mut quad, clock) = quadrotor(config);
    let seen = TargetObservation::detected(Vec3::new(0.2, 0.1, -2.0));

    while quad.mode() != Some(MissionMode::Track) {
        tick(&mut quad, &clock, seen);
    }

    // short dropout: keep tracking
    for _ in 0..5 {
        let outcome = tick(&mut quad, &clock, TargetObservation::missing());
        assert_eq!(outcome.mode, MissionMode::Track);
    }

    clock.advance_secs(1.0);
    assert_eq!(quad.is_target_losted(), Some(true));
    assert_eq!(quad.mode(), Some(MissionMode::Track));

    let outcome = quad.step(DT).unwrap();
    assert_eq!(outcome.mode, MissionMode::Discover);
    assert_eq!(
        outcome.transition.map(|t| t.reason),
        Some(TransitionReason::TargetLost)
    );
    assert_eq!(quad.target_losses(), Some(1));
}

#[test]
fn landing_disarms_on_fifth_qualifying_cycle() {
    let mut config = quick_config();
    config.mission.landing.cutoff_position = [0.1, 0.1, 0.1];
    config.mission.landing.belief_threshold = 5;
    let (mut quad, clock) = quadrotor(config);
    drive_to_land(&mut quad, &clock);

    let on_pad = TargetObservation::detected(Vec3::new(0.05, -0.05, -0.05));
    for cycle in 1..=4 {
        let outcome = tick(&mut quad, &clock, on_pad);
        assert_eq!(outcome.mode, MissionMode::Land, "disarmed early on cycle {cycle}");
        assert_eq!(quad.landing_belief(), Some(cycle));
    }

    let outcome = tick(&mut quad, &clock, on_pad);
    assert_eq!(outcome.mode, MissionMode::Disarm);
    assert_eq!(
        outcome.transition.map(|t| t.reason),
        Some(TransitionReason::Landed)
    );
    assert_eq!(outcome.command, AttitudeCommand::neutral());

    // stays down
    let outcome = tick(&mut quad, &clock, on_pad);
    assert_eq!(outcome.mode, MissionMode::Disarm);
    assert_eq!(outcome.command.throttle, 0.0);
}

#[test]
fn landing_height_follows_centring() {
    let (mut quad, clock) = quadrotor(quick_config());
    drive_to_land(&mut quad, &clock);
    assert_abs_diff_eq!(quad.landing_height().unwrap(), 2.0);

    // centred on x/y but still high: descend after each period
    let centred = TargetObservation::detected(Vec3::new(0.05, 0.0, -2.0));
    for _ in 0..12 {
        tick(&mut quad, &clock, centred);
    }
    assert_abs_diff_eq!(quad.landing_height().unwrap(), 1.6, epsilon = 1e-12);

    // drifted off: climb back, capped at the hover altitude
    let drifted = TargetObservation::detected(Vec3::new(0.6, 0.0, -2.0));
    for _ in 0..11 {
        tick(&mut quad, &clock, drifted);
    }
    assert_abs_diff_eq!(quad.landing_height().unwrap(), 1.92, epsilon = 1e-12);
    assert_eq!(quad.mode(), Some(MissionMode::Land));
}

#[test]
fn losing_target_while_landing_restores_hover_altitude() {
    let (mut quad, clock) = quadrotor(quick_config());
    drive_to_land(&mut quad, &clock);
    tick(&mut quad, &clock, TargetObservation::detected(Vec3::new(0.05, 0.0, -2.0)));
    assert_abs_diff_eq!(quad.hover_position().unwrap().z, 2.0);

    clock.advance_secs(1.5);
    quad.set_target_detected(false).unwrap();
    let outcome = quad.step(DT).unwrap();

    assert_eq!(outcome.mode, MissionMode::Discover);
    assert_abs_diff_eq!(quad.hover_position().unwrap().z, 3.0);
    assert_eq!(quad.landing_belief(), Some(0));
}

#[test]
fn landing_belief_restarts_after_losing_the_target() {
    let mut config = quick_config();
    config.mission.landing.belief_threshold = 50;
    let (mut quad, clock) = quadrotor(config);
    drive_to_land(&mut quad, &clock);

    let on_pad = TargetObservation::detected(Vec3::new(0.05, 0.0, -0.05));
    for _ in 0..10 {
        tick(&mut quad, &clock, on_pad);
    }
    assert_eq!(quad.mode(), Some(MissionMode::Land));
    assert_eq!(quad.landing_belief(), Some(10));

    clock.advance_secs(1.5);
    quad.set_target_detected(false).unwrap();
    let outcome = quad.step(DT).unwrap();
    assert_eq!(
        outcome.transition.map(|t| (t.from, t.to, t.reason)),
        Some((MissionMode::Land, MissionMode::Discover, TransitionReason::TargetLost))
    );
    assert_eq!(quad.landing_belief(), Some(0));

    // back to Land: the count starts over
    drive_to_land(&mut quad, &clock);
    assert_eq!(quad.landing_belief(), Some(0));
    for cycle in 1..=3 {
        tick(&mut quad, &clock, on_pad);
        assert_eq!(quad.landing_belief(), Some(cycle));
    }
}

#[test]
fn identical_inputs_give_identical_commands() {
    let run = || {
        let (mut quad, clock) = quadrotor(quick_config());
        (0..60)
            .map(|k| {
                let t = k as f64 * DT;
                let observation = if k % 7 == 3 {
                    TargetObservation::missing()
                } else {
                    TargetObservation::detected(Vec3::new(0.4 * t.cos(), 0.3 * t.sin(), -2.0))
                };
                quad.set_pose(Pose::from_euler(
                    Vec3::new(0.01 * t, 0.0, 2.0 - 0.01 * t),
                    0.02,
                    -0.01,
                    0.1,
                ))
                .unwrap();
                tick(&mut quad, &clock, observation)
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}
