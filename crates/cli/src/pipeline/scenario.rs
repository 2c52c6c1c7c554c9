//! Scenario runner - drives the provider against the in-memory simulator.
//!
//! One run binds a fresh context, spawns the hero and background actors,
//! optionally freezes the hero's next light, ticks, then cleans up.

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    roles, LightStateOverrides, Location, ProviderConfig, Rotation, TrafficLightState, Transform,
};
use data_provider::{
    ActorRequest, BatchRequest, MockConfig, MockLane, MockSimulator, MockTrafficLight,
    ScenarioContext,
};
use tracing::{info, warn};

use super::RunStats;
use crate::error::{CliError, Result};

const HERO_MODEL: &str = "vehicle.tesla.model3";
const SPAWN_SPACING: f64 = 12.0;
const LANE_START_X: f64 = -10.0;
/// Road left between the last spawn point and the junction
const JUNCTION_MARGIN: f64 = 30.0;

/// What a run should do
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub config: ProviderConfig,
    pub vehicles: usize,
    pub walkers: usize,
    pub spawn_points: usize,
    pub ticks: u64,
    pub green_wave: bool,
}

pub struct ScenarioRunner {
    plan: ScenarioPlan,
}

impl ScenarioRunner {
    pub fn new(plan: ScenarioPlan) -> Self {
        Self { plan }
    }

    /// Straight road along the spawn row ending in a signalised junction
    fn build_world(&self) -> MockSimulator {
        let plan = &self.plan;
        let mut mock = MockConfig::default()
            .with_spawn_row(plan.spawn_points, SPAWN_SPACING)
            .with_navigation_row((plan.walkers * 2).max(4), 6.0);
        if let Some(map) = &plan.config.simulator.map {
            mock.map_name = map.clone();
        }

        let junction_s = plan.spawn_points as f64 * SPAWN_SPACING + JUNCTION_MARGIN;
        let junction_x = LANE_START_X + junction_s;
        let sim = MockSimulator::with_config(mock);
        sim.add_lane(MockLane {
            road_id: 1,
            lane_id: -1,
            start: Location::new(LANE_START_X, 0.0, 0.0),
            yaw: 0.0,
            length: junction_s + 40.0,
            junction_start: junction_s,
        });

        // approach, crossing from the right, crossing from the left, oncoming
        let poles = [
            (junction_x - 5.0, 3.5, 0.0),
            (junction_x + 10.0, -10.0, 90.0),
            (junction_x - 10.0, 10.0, -90.0),
            (junction_x + 15.0, -3.5, 180.0),
        ];
        for (x, y, yaw) in poles {
            sim.add_traffic_light(MockTrafficLight::new(
                Transform::new(Location::new(x, y, 0.0), Rotation::from_yaw(yaw)),
                1,
            ));
        }
        sim
    }

    pub async fn run(self) -> Result<RunStats> {
        let start = Instant::now();
        let sim = Arc::new(self.build_world());
        let mut ctx = ScenarioContext::new(&self.plan.config);
        ctx.bind(Arc::clone(&sim))
            .await
            .map_err(CliError::scenario("bind"))?;

        let mut stats = RunStats::default();

        let hero = ctx
            .spawn_tracked(
                ActorRequest::new(HERO_MODEL, Transform::default())
                    .role_name(roles::HERO)
                    .random_location(true),
            )
            .await
            .map_err(CliError::scenario("hero"))?
            .ok_or(CliError::NoHero)?;
        stats.hero = Some(hero.id);

        let batches = [
            BatchRequest::new("vehicle.*", self.plan.vehicles).autopilot(true),
            BatchRequest::new("walker.pedestrian.*", self.plan.walkers),
        ];
        for request in batches {
            if request.count == 0 {
                continue;
            }
            let requested = request.count;
            let batch_start = Instant::now();
            let actors = ctx
                .spawn_batch_tracked(request)
                .await
                .map_err(CliError::scenario("batch"))?;
            stats.metrics.record_batch(
                requested,
                actors.iter().map(|a| a.kind()),
                requested.saturating_sub(actors.len()),
                batch_start.elapsed(),
            );
        }

        stats.traffic_lights = ctx
            .provider
            .prepare_map()
            .await
            .map_err(CliError::scenario("prepare_map"))?;
        let next = ctx
            .provider
            .get_next_traffic_light(hero.id, false)
            .await
            .map_err(CliError::scenario("next_traffic_light"))?;
        stats.next_light = next.as_ref().map(|l| l.id);

        let mut records = Vec::new();
        match (&next, self.plan.green_wave) {
            (Some(light), true) => {
                let annotations = ctx
                    .provider
                    .annotate_group(light.id)
                    .await
                    .map_err(CliError::scenario("annotate_group"))?;
                let overrides = LightStateOverrides {
                    ego: Some(TrafficLightState::Green),
                    opposite: Some(TrafficLightState::Green),
                    left: Some(TrafficLightState::Red),
                    right: Some(TrafficLightState::Red),
                    ..Default::default()
                };
                records = ctx
                    .provider
                    .update_light_states(Some(light.id), &annotations, &overrides, true, None)
                    .await
                    .map_err(CliError::scenario("update_light_states"))?;
                info!(light = light.id, overridden = records.len(), "green wave set");
            }
            (None, true) => warn!(hero = hero.id, "no traffic light ahead of the hero"),
            _ => {}
        }
        stats.lights_overridden = records.len();

        for _ in 0..self.plan.ticks {
            let tick_start = Instant::now();
            stats.last_frame = ctx.step().await.map_err(CliError::scenario("tick"))?;
            stats.metrics.record_tick(tick_start.elapsed());
        }
        stats.hero_speed = ctx.provider.get_velocity(hero.id);
        stats.pool_size = ctx.pool.len();

        if !records.is_empty() {
            ctx.provider
                .reset_lights(&records)
                .await
                .map_err(CliError::scenario("reset_lights"))?;
        }

        ctx.cleanup().await;
        stats.remaining_actors = sim.actor_count();
        stats.duration = start.elapsed();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(seed: u64) -> ScenarioPlan {
        let mut config = ProviderConfig::default();
        config.spawn.seed = Some(seed);
        ScenarioPlan {
            config,
            vehicles: 5,
            walkers: 3,
            spawn_points: 12,
            ticks: 4,
            green_wave: true,
        }
    }

    #[tokio::test]
    async fn test_run_spawns_and_cleans_up() {
        let stats = ScenarioRunner::new(plan(11)).run().await.unwrap();
        let summary = stats.metrics.summary();

        assert!(stats.hero.is_some());
        assert_eq!(summary.total_batches, 2);
        assert!(summary.materialized >= 1);
        // hero plus every materialized batch actor
        assert_eq!(stats.pool_size as u64, 1 + summary.materialized);
        assert_eq!(summary.total_ticks, 4);
        assert_eq!(stats.traffic_lights, 4);
        // only the traffic lights survive cleanup
        assert_eq!(stats.remaining_actors, 4);
    }

    #[tokio::test]
    async fn test_run_finds_light_ahead() {
        let stats = ScenarioRunner::new(plan(3)).run().await.unwrap();
        assert!(stats.next_light.is_some());
        assert!(stats.lights_overridden >= 1);
    }

    #[tokio::test]
    async fn test_run_without_batches() {
        let mut plan = plan(5);
        plan.vehicles = 0;
        plan.walkers = 0;
        plan.green_wave = false;

        let stats = ScenarioRunner::new(plan).run().await.unwrap();
        assert_eq!(stats.metrics.summary().total_batches, 0);
        assert_eq!(stats.pool_size, 1);
        assert_eq!(stats.lights_overridden, 0);
    }
}
