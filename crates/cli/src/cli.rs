//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scenario Provider - actor pool and world-state cache for CARLA scenarios
#[derive(Parser, Debug)]
#[command(
    name = "scenario-provider",
    author,
    version,
    about = "CARLA scenario data provider and actor pool",
    long_about = "Runs the scenario data provider against an in-memory simulator.\n\n\
                  Spawns a hero, background traffic and pedestrians, refreshes the \n\
                  per-tick state cache and exercises the traffic-light overrides."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SCENARIO_PROVIDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SCENARIO_PROVIDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter level from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario against the in-memory simulator
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "SCENARIO_PROVIDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the RNG seed from configuration
    #[arg(long, env = "SCENARIO_PROVIDER_SEED")]
    pub seed: Option<u64>,

    /// Background vehicles to request
    #[arg(long, default_value = "8")]
    pub vehicles: usize,

    /// Pedestrians to request
    #[arg(long, default_value = "4")]
    pub walkers: usize,

    /// Spawn points laid out in the mock world
    #[arg(long, default_value = "16")]
    pub spawn_points: usize,

    /// Simulation ticks after spawning
    #[arg(long, default_value = "20")]
    pub ticks: u64,

    /// Freeze the hero's next traffic light to green while ticking
    #[arg(long)]
    pub green_wave: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SCENARIO_PROVIDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "provider.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "provider.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
