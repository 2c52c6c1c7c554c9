//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::ProviderConfig;
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{ScenarioPlan, ScenarioRunner};

/// Execute the `run` command
pub async fn run_scenario(args: &RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            load_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            ProviderConfig::default()
        }
    };

    if let Some(seed) = args.seed {
        info!(seed, "Overriding RNG seed from CLI");
        config.spawn.seed = Some(seed);
    }

    info!(
        host = %config.simulator.host,
        port = config.simulator.port,
        vehicles = args.vehicles,
        walkers = args.walkers,
        ticks = args.ticks,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, args);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let runner = ScenarioRunner::new(ScenarioPlan {
        config,
        vehicles: args.vehicles,
        walkers: args.walkers,
        spawn_points: args.spawn_points,
        ticks: args.ticks,
        green_wave: args.green_wave,
    });

    info!("Starting scenario...");

    tokio::select! {
        result = runner.run() => {
            let stats = result.context("Scenario execution failed")?;
            info!(
                pool_size = stats.pool_size,
                last_frame = stats.last_frame,
                duration_secs = stats.duration.as_secs_f64(),
                "Scenario completed successfully"
            );
            stats.print_summary();
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, stopping scenario...");
        }
    }

    info!("Scenario Provider finished");
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ProviderConfig, args: &RunArgs) {
    println!("\n=== Configuration Summary ===\n");
    println!("Simulator: {}:{}", config.simulator.host, config.simulator.port);
    if let Some(map) = &config.simulator.map {
        println!("  Map: {}", map);
    }
    println!("\nSpawn:");
    println!("  Seed: {:?}", config.spawn.seed);
    println!("  Hero clearance: {} m", config.spawn.hero_clearance);
    println!(
        "  Walker speed: {}..={} m/s (running {:.0}%)",
        config.spawn.walker_speed_min,
        config.spawn.walker_speed_max,
        config.spawn.running_probability * 100.0
    );
    println!("\nRun:");
    println!("  Vehicles: {}", args.vehicles);
    println!("  Walkers: {}", args.walkers);
    println!("  Spawn points: {}", args.spawn_points);
    println!("  Ticks: {}", args.ticks);
    println!();
}
