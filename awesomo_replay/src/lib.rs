// awesomo_replay/src/lib.rs

//! Offline replay of the mission sequencer against scripted scenarios.

pub mod cli;
pub mod runner;
pub mod scenario;
pub mod script;

pub mod prelude {
    pub use crate::cli::Cli;
    pub use crate::runner::{run_scenario, write_report, ReplayError, ReplaySummary};
    pub use crate::scenario::{discover_scenarios, ScenarioConfig, ScenarioError};
    pub use crate::script::{Sample, ScriptedFeed};
}
