// awesomo_replay/src/main.rs

use std::process::ExitCode;

use awesomo_core::mission::MissionMode;
use awesomo_replay::prelude::*;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let expected = match cli.expect_mode.as_deref() {
        Some(name) => match MissionMode::from_name(name) {
            Some(mode) => Some(mode),
            None => {
                error!(%name, "unknown mission mode");
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let files = discover_scenarios(&cli.scenario);
    if files.is_empty() {
        error!(path = %cli.scenario.display(), "no scenario files found");
        return ExitCode::FAILURE;
    }

    let mut summaries = Vec::with_capacity(files.len());
    let mut failed = false;
    for path in &files {
        let result = ScenarioConfig::load(path)
            .map_err(ReplayError::from)
            .and_then(|scenario| run_scenario(&scenario));
        match result {
            Ok(summary) => {
                info!(
                    scenario = %summary.name,
                    final_mode = %summary.final_mode,
                    steps = summary.steps,
                    transitions = summary.transitions.len(),
                    target_losses = summary.target_losses,
                    "replay finished"
                );
                if let Some(mode) = expected {
                    if summary.final_mode() != Some(mode) {
                        error!(scenario = %summary.name, expected = %mode, got = %summary.final_mode, "unexpected final mode");
                        failed = true;
                    }
                }
                summaries.push(summary);
            }
            Err(err) => {
                error!(path = %path.display(), %err, "replay failed");
                failed = true;
            }
        }
    }

    if let Some(report) = &cli.report {
        if let Err(err) = write_report(report, &summaries) {
            error!(%err, "could not write report");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
