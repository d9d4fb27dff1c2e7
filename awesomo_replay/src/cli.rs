// awesomo_replay/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Awesomo replay: runs the landing mission sequencer against scripted
/// sensor feeds.
///
/// Each scenario file describes where the vehicle and the target are over
/// time. The sequencer is stepped on a simulated clock, so a replay with the
/// same seed always produces the same result.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// A scenario TOML file, or a directory searched for them.
    #[arg(short, long, default_value = "awesomo_replay/scenarios")]
    pub scenario: PathBuf,

    /// Write a TOML summary of every replay to this file.
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Exit with an error unless every scenario ends in this mode.
    #[arg(long)]
    pub expect_mode: Option<String>,
}
