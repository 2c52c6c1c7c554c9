//! ProviderConfig - Config Loader output
//!
//! Tuning knobs for the data provider and actor pool. Every field has a
//! default so an empty file is a valid configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::VehicleCategory;

/// Complete provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Simulator endpoint
    #[serde(default)]
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    /// Actor spawning
    #[serde(default)]
    #[validate(nested)]
    pub spawn: SpawnConfig,

    /// Frame barrier used by batch spawning
    #[serde(default)]
    #[validate(nested)]
    pub barrier: BarrierConfig,

    /// Traffic-light registry and lookahead
    #[serde(default)]
    #[validate(nested)]
    pub traffic_lights: TrafficLightConfig,
}

/// Simulator endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulatorConfig {
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Map expected by the scenario (informational)
    #[serde(default)]
    pub map: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    2000
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            map: None,
        }
    }
}

/// Actor spawning parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SpawnConfig {
    /// Vertical lift applied to exact spawn poses (metres)
    #[serde(default = "default_ground_lift")]
    #[validate(range(min = 0.0))]
    pub ground_lift: f64,

    /// Vertical lift applied to navigation points for walkers (metres)
    #[serde(default = "default_walker_lift")]
    #[validate(range(min = 0.0))]
    pub walker_lift: f64,

    /// Candidates closer than this to the hero are skipped (metres)
    #[serde(default = "default_hero_clearance")]
    #[validate(range(min = 0.0))]
    pub hero_clearance: f64,

    /// Attempts for random-location single spawns
    #[serde(default = "default_max_random_attempts")]
    #[validate(range(min = 1))]
    pub max_random_attempts: u32,

    /// Share of walkers using the running speed
    #[serde(default = "default_running_probability")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub running_probability: f64,

    /// Walker controller max-speed range (m/s)
    #[serde(default = "default_walker_speed_min")]
    #[validate(range(min = 0.0))]
    pub walker_speed_min: f64,

    #[serde(default = "default_walker_speed_max")]
    #[validate(range(min = 0.0))]
    pub walker_speed_max: f64,

    /// Default pedestrian crossing factor
    #[serde(default = "default_cross_factor")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub cross_factor: f64,

    /// RNG seed; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Per-category fallback blueprint overrides
    #[serde(default)]
    pub category_defaults: BTreeMap<VehicleCategory, String>,
}

fn default_ground_lift() -> f64 {
    0.2
}

fn default_walker_lift() -> f64 {
    1.0
}

fn default_hero_clearance() -> f64 {
    8.0
}

fn default_max_random_attempts() -> u32 {
    64
}

fn default_running_probability() -> f64 {
    0.1
}

fn default_walker_speed_min() -> f64 {
    1.0
}

fn default_walker_speed_max() -> f64 {
    2.0
}

fn default_cross_factor() -> f64 {
    0.01
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            ground_lift: default_ground_lift(),
            walker_lift: default_walker_lift(),
            hero_clearance: default_hero_clearance(),
            max_random_attempts: default_max_random_attempts(),
            running_probability: default_running_probability(),
            walker_speed_min: default_walker_speed_min(),
            walker_speed_max: default_walker_speed_max(),
            cross_factor: default_cross_factor(),
            seed: None,
            category_defaults: BTreeMap::new(),
        }
    }
}

impl SpawnConfig {
    /// Fallback blueprint pattern for a category: override, then built-in
    pub fn default_blueprint_for(&self, category: VehicleCategory) -> Option<&str> {
        match self.category_defaults.get(&category) {
            Some(model) if !model.is_empty() => Some(model.as_str()),
            Some(_) => None,
            None => category.default_blueprint(),
        }
    }
}

/// Frame barrier parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BarrierConfig {
    /// Give up waiting after this long
    #[serde(default = "default_barrier_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// First poll delay
    #[serde(default = "default_initial_backoff_us")]
    #[validate(range(min = 1))]
    pub initial_backoff_us: u64,

    /// Poll delay ceiling
    #[serde(default = "default_max_backoff_ms")]
    #[validate(range(min = 1))]
    pub max_backoff_ms: u64,
}

fn default_barrier_timeout_ms() -> u64 {
    10_000
}

fn default_initial_backoff_us() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    20
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_barrier_timeout_ms(),
            initial_backoff_us: default_initial_backoff_us(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl BarrierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_micros(self.initial_backoff_us)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Traffic-light parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrafficLightConfig {
    /// Actor filter used to scan for lights
    #[serde(default = "default_light_filter")]
    #[validate(length(min = 1))]
    pub filter: String,

    /// Step length when walking a lane forward (metres)
    #[serde(default = "default_lookahead_step")]
    #[validate(range(min = 0.1))]
    pub lookahead_step: f64,

    /// Upper bound on lane steps (guards cyclic lane graphs)
    #[serde(default = "default_max_lookahead_steps")]
    #[validate(range(min = 1))]
    pub max_lookahead_steps: usize,

    /// Phase duration used when freezing lights (seconds)
    #[serde(default = "default_freeze_timeout")]
    #[validate(range(min = 0.0))]
    pub freeze_timeout: f64,
}

fn default_light_filter() -> String {
    "*traffic_light*".to_string()
}

fn default_lookahead_step() -> f64 {
    2.0
}

fn default_max_lookahead_steps() -> usize {
    10_000
}

fn default_freeze_timeout() -> f64 {
    1_000_000_000.0
}

impl Default for TrafficLightConfig {
    fn default() -> Self {
        Self {
            filter: default_light_filter(),
            lookahead_step: default_lookahead_step(),
            max_lookahead_steps: default_max_lookahead_steps(),
            freeze_timeout: default_freeze_timeout(),
        }
    }
}
