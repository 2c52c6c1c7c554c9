//! Scenario orchestration module.

mod scenario;
mod stats;

pub use scenario::{ScenarioPlan, ScenarioRunner};
pub use stats::RunStats;
