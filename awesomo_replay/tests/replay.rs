// awesomo_replay/tests/replay.rs

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use awesomo_core::mission::MissionMode;
use awesomo_replay::prelude::*;

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn load(name: &str) -> ScenarioConfig {
    ScenarioConfig::from_toml_str(&std::fs::read_to_string(scenario_path(name)).unwrap())
        .unwrap()
}

fn modes_visited(summary: &ReplaySummary) -> Vec<String> {
    summary.transitions.iter().map(|t| t.to.clone()).collect()
}

#[test]
fn bundled_scenarios_are_discovered() {
    let files = discover_scenarios(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios"));
    let names: Vec<_> = files
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
        .collect();
    assert_eq!(names, vec!["land_on_static_pad.toml", "waypoint_square.toml"]);
}

#[test]
fn static_pad_is_landed_on() {
    let summary = run_scenario(&load("land_on_static_pad.toml")).unwrap();

    assert_eq!(summary.final_mode(), Some(MissionMode::Disarm));
    assert_eq!(modes_visited(&summary), vec!["TRACK", "LAND", "DISARM"]);
    assert_eq!(summary.target_losses, 0);
    assert_eq!(summary.dropouts, 0);

    // the first step starts the discover timer, so the switch waits > 1 s
    let acquired = &summary.transitions[0];
    assert_eq!(acquired.reason, "TargetAcquired");
    assert!(acquired.time > 1.0 && acquired.time < 1.2);

    // disarmed on the pad, before the replay ran out
    let landed = &summary.transitions[2];
    assert!(landed.time > 9.0 && landed.time < 14.0);
    assert!(summary.steps < 280);

    let estimate = summary.target_estimate.unwrap();
    assert_abs_diff_eq!(estimate[0], 0.0, epsilon = 0.1);
    assert_abs_diff_eq!(estimate[1], 0.0, epsilon = 0.1);
}

#[test]
fn square_route_is_accomplished() {
    let summary = run_scenario(&load("waypoint_square.toml")).unwrap();

    assert_eq!(summary.final_mode(), Some(MissionMode::Accomplished));
    assert_eq!(modes_visited(&summary), vec!["ACCOMPLISHED"]);
    assert_eq!(summary.transitions[0].reason, "RouteComplete");
    assert!(summary.transitions[0].time > 15.0);
    assert_eq!(summary.detections, 0);
    assert_eq!(summary.target_estimate, None);
    assert!(summary.min_throttle >= 0.0 && summary.max_throttle <= 1.0);
}

#[test]
fn same_seed_same_replay() {
    let mut scenario = load("land_on_static_pad.toml");
    for phase in &mut scenario.phases {
        phase.dropout_probability = 0.2;
        phase.noise_stddev = 0.05;
    }
    let first = run_scenario(&scenario).unwrap();
    let second = run_scenario(&scenario).unwrap();
    assert_eq!(first, second);
    assert!(first.dropouts > 0);
}

#[test]
fn long_dropout_loses_the_target() {
    let toml = r#"
        [replay]
        name = "blackout"
        seed = 5
        dt = 0.1
        duration_seconds = 8.0

        [vehicle.mission]
        min_discover_time = 0.5
        min_track_time = 100.0

        [[phases]]
        duration = 3.0
        vehicle_start = [0.0, 0.0, 3.0]
        target_start = [0.3, 0.0, 0.0]

        [[phases]]
        duration = 5.0
        detected = false
        vehicle_start = [0.0, 0.0, 3.0]
    "#;
    let summary = run_scenario(&ScenarioConfig::from_toml_str(toml).unwrap()).unwrap();

    assert_eq!(modes_visited(&summary), vec!["TRACK", "DISCOVER"]);
    assert_eq!(summary.transitions[1].reason, "TargetLost");
    assert_eq!(summary.target_losses, 1);
    assert_eq!(summary.final_mode(), Some(MissionMode::Discover));
}

#[test]
fn report_lists_every_scenario() {
    let summaries = vec![
        run_scenario(&load("land_on_static_pad.toml")).unwrap(),
        run_scenario(&load("waypoint_square.toml")).unwrap(),
    ];
    let path = std::env::temp_dir().join(format!("awesomo_report_{}.toml", std::process::id()));

    write_report(&path, &summaries).unwrap();
    let written: toml::Table = std::fs::read_to_string(&path).unwrap().parse().unwrap();
    std::fs::remove_file(&path).unwrap();

    let scenarios = written["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0]["final_mode"].as_str(), Some("DISARM"));
    assert_eq!(scenarios[1]["final_mode"].as_str(), Some("ACCOMPLISHED"));
}

#[test]
fn invalid_scenarios_are_rejected() {
    let missing = ScenarioConfig::load(&scenario_path("nope.toml"));
    assert!(matches!(missing, Err(ScenarioError::NotFound(_))));

    let bad_vehicle = r#"
        [replay]
        name = "bad"
        seed = 0
        dt = 0.1
        duration_seconds = 1.0

        [vehicle.carrot]
        wp_threshold = -1.0

        [[phases]]
        duration = 1.0
        vehicle_start = [0.0, 0.0, 3.0]
    "#;
    assert!(matches!(
        ScenarioConfig::from_toml_str(bad_vehicle),
        Err(ScenarioError::Vehicle(_))
    ));

    let no_phases = "[replay]\nname = \"empty\"\nseed = 0\ndt = 0.1\nduration_seconds = 1.0\n";
    assert!(matches!(
        ScenarioConfig::from_toml_str(no_phases),
        Err(ScenarioError::Invalid { .. })
    ));
}
