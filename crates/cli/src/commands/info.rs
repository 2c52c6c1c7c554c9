//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ProviderConfig;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&config).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &ProviderConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Scenario Provider Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let sim = &config.simulator;
    println!("📍 Simulator");
    println!("   ├─ Server: {}:{}", sim.host, sim.port);
    println!("   └─ Map: {}", sim.map.as_deref().unwrap_or("(any)"));

    let spawn = &config.spawn;
    println!("\n🚗 Spawning");
    println!("   ├─ Ground lift: {} m", spawn.ground_lift);
    println!("   ├─ Walker lift: {} m", spawn.walker_lift);
    println!("   ├─ Hero clearance: {} m", spawn.hero_clearance);
    println!("   ├─ Random attempts: {}", spawn.max_random_attempts);
    println!(
        "   ├─ Walkers: {}..={} m/s, {:.0}% running, cross factor {}",
        spawn.walker_speed_min,
        spawn.walker_speed_max,
        spawn.running_probability * 100.0,
        spawn.cross_factor
    );
    match spawn.seed {
        Some(seed) => println!("   └─ Seed: {}", seed),
        None => println!("   └─ Seed: (entropy)"),
    }
    if !spawn.category_defaults.is_empty() {
        println!("      Category overrides:");
        for (category, model) in &spawn.category_defaults {
            let model = if model.is_empty() { "(disabled)" } else { model };
            println!("        {:?} → {}", category, model);
        }
    }

    let barrier = &config.barrier;
    println!("\n⏱  Frame Barrier");
    println!("   ├─ Timeout: {} ms", barrier.timeout_ms);
    println!(
        "   └─ Backoff: {} µs → {} ms",
        barrier.initial_backoff_us, barrier.max_backoff_ms
    );

    let lights = &config.traffic_lights;
    println!("\n🚦 Traffic Lights");
    println!("   ├─ Filter: {}", lights.filter);
    println!(
        "   ├─ Lookahead: {} m steps, at most {}",
        lights.lookahead_step, lights.max_lookahead_steps
    );
    println!("   └─ Freeze timeout: {} s", lights.freeze_timeout);

    println!();
}
