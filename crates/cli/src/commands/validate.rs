//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::ProviderConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    simulator: String,
    seeded: bool,
    barrier_timeout_ms: u64,
    category_overrides: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let config_path = args.config.display().to_string();
    let result = match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() { None } else { Some(warnings) },
                summary: Some(ConfigSummary {
                    simulator: format!("{}:{}", config.simulator.host, config.simulator.port),
                    seeded: config.spawn.seed.is_some(),
                    barrier_timeout_ms: config.barrier.timeout_ms,
                    category_overrides: config.spawn.category_defaults.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ProviderConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.spawn.seed.is_none() {
        warnings.push("spawn.seed is unset - runs are not reproducible".to_string());
    }

    for (category, model) in &config.spawn.category_defaults {
        if model.is_empty() {
            warnings.push(format!(
                "spawn.category_defaults.{:?} is empty - requests of that category fail without a match",
                category
            ));
        }
    }

    if config.spawn.hero_clearance == 0.0 {
        warnings.push("spawn.hero_clearance is 0 - batches may spawn on top of the hero".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Simulator: {}", summary.simulator);
            println!("  Seeded: {}", summary.seeded);
            println!("  Barrier timeout: {} ms", summary.barrier_timeout_ms);
            println!("  Category overrides: {}", summary.category_overrides);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
