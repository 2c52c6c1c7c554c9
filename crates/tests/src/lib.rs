//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 状态缓存与交通灯注册表的行为性质
//! - Actor pool 与批量 spawn 的端到端测试（无需 CARLA）
//! - 配置加载到场景上下文的贯通

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use contracts::{ActorHandle, ActorId, Location, Rotation, Transform};
    use data_provider::{MockConfig, MockSimulator};

    pub fn sim(config: MockConfig) -> Arc<MockSimulator> {
        Arc::new(MockSimulator::with_config(config))
    }

    pub fn pose(x: f64, y: f64, yaw: f64) -> Transform {
        Transform::new(Location::new(x, y, 0.0), Rotation::from_yaw(yaw))
    }

    /// Put a vehicle straight into the world, bypassing the pool
    pub fn place_vehicle(sim: &MockSimulator, x: f64, y: f64) -> ActorHandle {
        let id: ActorId = sim.next_id();
        let handle = ActorHandle::new(id, "vehicle.tesla.model3");
        sim.place_actor(handle.clone(), pose(x, y, 0.0));
        handle
    }
}

#[cfg(test)]
mod state_cache_tests {
    use contracts::{Location, Rotation, TrafficLightConfig, Transform, Vector3D};
    use data_provider::{CarlaDataProvider, MockConfig, MockSimulator, ProviderError};

    use super::support::{place_vehicle, sim};

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let sim = sim(MockConfig::default());
        let a = place_vehicle(&sim, 0.0, 0.0);
        let b = place_vehicle(&sim, 10.0, 0.0);

        let mut provider = CarlaDataProvider::<MockSimulator>::new(TrafficLightConfig::default());
        provider.register_actor(&a).unwrap();
        provider.register_actor(&b).unwrap();

        let err = provider.register_actor(&a).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::DuplicateRegistration { actor_id, .. } if actor_id == a.id
        ));
        assert_eq!(provider.state_cache().len(), 2);
    }

    #[tokio::test]
    async fn test_tick_mirrors_live_and_keeps_dead_stale() {
        let sim = sim(MockConfig::default());
        let live = place_vehicle(&sim, 0.0, 0.0);
        let dead = place_vehicle(&sim, 20.0, 0.0);

        let mut provider = CarlaDataProvider::new(TrafficLightConfig::default());
        provider.set_world(sim.clone()).await.unwrap();
        provider.register_actors(&[live.clone(), dead.clone()]).unwrap();
        provider.on_tick().await.unwrap();
        let dead_before = provider.get_transform(dead.id).unwrap();

        let moved = Transform::new(Location::new(3.0, -2.0, 0.5), Rotation::from_yaw(45.0));
        sim.set_transform(live.id, moved);
        sim.set_velocity(live.id, Vector3D::new(3.0, 4.0, 9.0));
        sim.kill(dead.id);
        provider.on_tick().await.unwrap();

        assert_eq!(provider.get_transform(live.id), Some(moved));
        assert_eq!(provider.get_location(live.id), Some(moved.location));
        // planar magnitude only
        assert!((provider.get_velocity(live.id) - 5.0).abs() < 1e-9);
        assert_eq!(provider.get_transform(dead.id), Some(dead_before));
        assert_eq!(provider.get_velocity(dead.id), 0.0);
    }

    #[tokio::test]
    async fn test_unregistered_queries_return_defaults() {
        let provider = CarlaDataProvider::<MockSimulator>::new(TrafficLightConfig::default());
        assert_eq!(provider.get_velocity(4242), 0.0);
        assert!(provider.get_location(4242).is_none());
        assert!(provider.get_transform(4242).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_allows_reregistration() {
        let sim = sim(MockConfig::default());
        let actor = place_vehicle(&sim, 0.0, 0.0);

        let mut provider = CarlaDataProvider::new(TrafficLightConfig::default());
        provider.set_world(sim.clone()).await.unwrap();
        provider.register_actor(&actor).unwrap();
        provider.cleanup();

        assert!(provider.get_world().is_none());
        assert!(provider.state_cache().is_empty());
        assert!(provider.traffic_lights().is_empty());
        assert!(provider.get_ego_vehicle_route().is_none());

        provider.set_world(sim).await.unwrap();
        provider.register_actor(&actor).unwrap();
    }
}

#[cfg(test)]
mod traffic_light_tests {
    use contracts::{
        BoundingBox, GroupBucket, LightStateOverrides, LightTiming, Location, TrafficLightConfig,
        TrafficLightInfo, TrafficLightState, Vector3D,
    };
    use data_provider::{
        annotate_lights, classify_heading, CarlaDataProvider, MockConfig, MockLane,
        MockSimulator, MockTrafficLight,
    };

    use super::support::{place_vehicle, pose, sim};

    fn info(id: u32, yaw: f64) -> TrafficLightInfo {
        TrafficLightInfo {
            id,
            transform: pose(0.0, 0.0, yaw),
            trigger_volume: None,
        }
    }

    #[test]
    fn test_self_is_reference() {
        for yaw in [-180.0, -45.0, 0.0, 33.0, 270.0] {
            assert_eq!(classify_heading(yaw, yaw), GroupBucket::Ref);
        }
    }

    #[test]
    fn test_annotation_is_rotation_invariant() {
        let offsets = [0.0, 90.0, 180.0, 270.0];
        let build = |shift: f64| {
            let group: Vec<_> = offsets
                .iter()
                .enumerate()
                .map(|(i, o)| info(i as u32 + 1, o + shift))
                .collect();
            annotate_lights(&group[0], &group)
        };

        let base = build(0.0);
        assert_eq!(base.reference, vec![1]);
        assert_eq!(base.right, vec![2]);
        assert_eq!(base.opposite, vec![3]);
        assert_eq!(base.left, vec![4]);

        for shift in [37.0, 90.0, 180.0, -120.0, 355.0] {
            assert_eq!(build(shift), base, "shift {shift}");
        }
    }

    /// Four lights of one junction, each with distinct timing
    fn junction(sim: &MockSimulator) -> Vec<u32> {
        [0.0, 90.0, 180.0, 270.0]
            .iter()
            .enumerate()
            .map(|(i, yaw)| {
                let i = i as f64;
                sim.add_traffic_light(MockTrafficLight {
                    timing: LightTiming {
                        state: TrafficLightState::Red,
                        green_time: 10.0 + i,
                        red_time: 20.0 + i,
                        yellow_time: 3.0 + i,
                    },
                    ..MockTrafficLight::new(pose(100.0 + 10.0 * i, 0.0, *yaw), 7)
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_override_then_reset_restores_every_subset() {
        let sim = sim(MockConfig::default());
        let lights = junction(&sim);
        let original: Vec<LightTiming> =
            lights.iter().map(|id| sim.timing_of(*id).unwrap()).collect();

        let mut provider = CarlaDataProvider::new(TrafficLightConfig::default());
        provider.set_world(sim.clone()).await.unwrap();
        let ego = lights[0];
        let annotations = provider.annotate_group(ego).await.unwrap();

        let pick = |mask: u32, bit: u32, state| (mask & (1 << bit) != 0).then_some(state);
        for mask in 1..32u32 {
            let overrides = LightStateOverrides {
                ego: pick(mask, 0, TrafficLightState::Green),
                reference: pick(mask, 1, TrafficLightState::Yellow),
                left: pick(mask, 2, TrafficLightState::Green),
                right: pick(mask, 3, TrafficLightState::Off),
                opposite: pick(mask, 4, TrafficLightState::Green),
            };
            let records = provider
                .update_light_states(Some(ego), &annotations, &overrides, true, Some(500.0))
                .await
                .unwrap();
            assert!(!records.is_empty(), "mask {mask:#07b}");

            provider.reset_lights(&records).await.unwrap();
            for (id, timing) in lights.iter().zip(&original) {
                assert_eq!(sim.timing_of(*id).as_ref(), Some(timing), "mask {mask:#07b}");
            }
        }
    }

    #[tokio::test]
    async fn test_next_light_is_nearest_trigger_before_junction() {
        let sim = sim(MockConfig::default());
        sim.add_lane(MockLane {
            road_id: 3,
            lane_id: -1,
            start: Location::new(0.0, 0.0, 0.0),
            yaw: 0.0,
            length: 100.0,
            junction_start: 60.0,
        });
        // triggers land at (60, 4), (35, -4) and (70, 15)
        let near = sim.add_traffic_light(MockTrafficLight::new(pose(55.0, 4.0, 0.0), 1));
        let behind = sim.add_traffic_light(MockTrafficLight::new(pose(30.0, -4.0, 0.0), 2));
        let _side = sim.add_traffic_light(MockTrafficLight::new(pose(70.0, 10.0, 90.0), 1));
        let unbound = sim.add_traffic_light(MockTrafficLight {
            trigger_volume: None,
            ..MockTrafficLight::new(pose(59.0, 0.0, 0.0), 1)
        });

        let approaching = place_vehicle(&sim, 10.0, 0.0);
        let inside = place_vehicle(&sim, 65.0, 0.0);

        let mut provider = CarlaDataProvider::new(TrafficLightConfig::default());
        provider.set_world(sim.clone()).await.unwrap();

        let next = provider
            .get_next_traffic_light(approaching.id, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.id, near);
        assert_ne!(next.id, behind);
        assert_ne!(next.id, unbound);
        assert_eq!(provider.traffic_lights().len(), 4);

        let none = provider.get_next_traffic_light(inside.id, false).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_prepare_map_rebuilds_registry() {
        let sim = sim(MockConfig::default());
        sim.add_traffic_light(MockTrafficLight::new(pose(0.0, 0.0, 0.0), 1));

        let mut provider = CarlaDataProvider::new(TrafficLightConfig::default());
        provider.set_world(sim.clone()).await.unwrap();
        assert_eq!(provider.prepare_map().await.unwrap(), 1);

        let second = sim.add_traffic_light(MockTrafficLight {
            trigger_volume: Some(BoundingBox {
                location: Location::new(2.0, 0.0, 0.0),
                extent: Vector3D::new(1.0, 1.0, 1.0),
            }),
            ..MockTrafficLight::new(pose(50.0, 0.0, 0.0), 2)
        });
        assert_eq!(provider.prepare_map().await.unwrap(), 2);
        assert!(provider.traffic_lights().contains(second));
    }
}

#[cfg(test)]
mod pool_tests {
    use std::sync::Arc;

    use contracts::{roles, BarrierConfig, Location, SpawnConfig};
    use data_provider::{
        ActorRequest, BatchRequest, CarlaActorPool, MockConfig, MockSimulator, SimulatorClient,
    };

    use super::support::{pose, sim};

    async fn bound_pool(sim: &Arc<MockSimulator>) -> CarlaActorPool<MockSimulator> {
        let config = SpawnConfig {
            seed: Some(17),
            ..Default::default()
        };
        let mut pool = CarlaActorPool::new(config, &BarrierConfig::default());
        pool.set_world(Arc::clone(sim)).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_remove_in_surrounding_is_strict() {
        let sim = sim(MockConfig::default());
        let mut pool = bound_pool(&sim).await;

        let mut ids = Vec::new();
        for x in [0.0, 10.0, 20.0, 30.0] {
            let actor = pool
                .request_new_actor(ActorRequest::new("vehicle.audi.tt", pose(x, 0.0, 0.0)))
                .await
                .unwrap();
            ids.push(actor.id);
        }

        let lift = SpawnConfig::default().ground_lift;
        let removed = pool
            .remove_actors_in_surrounding(Location::new(0.0, 0.0, lift), 20.0)
            .await;

        assert_eq!(removed, 2);
        for id in &ids[..2] {
            assert!(!pool.actor_id_exists(*id));
            assert!(pool.get_actor_by_id(*id).is_none());
            assert!(!sim.contains(*id));
        }
        // exactly on the radius stays
        for id in &ids[2..] {
            assert!(pool.actor_id_exists(*id));
            assert!(sim.contains(*id));
        }
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_resets_pool() {
        let sim = sim(MockConfig::default().with_spawn_row(4, 15.0));
        let mut pool = bound_pool(&sim).await;
        let hero = pool
            .request_new_actor(
                ActorRequest::new("vehicle.tesla.model3", pose(0.0, 0.0, 0.0))
                    .role_name(roles::HERO)
                    .random_location(true),
            )
            .await
            .unwrap();
        assert_eq!(pool.get_hero_actor().map(|a| a.id), Some(hero.id));

        pool.cleanup().await;
        assert!(pool.is_empty());
        assert!(pool.get_hero_actor().is_none());
        assert!(pool.spawn_points().is_empty());
        assert_eq!(sim.actor_count(), 0);

        // a fresh binding works as before
        pool.set_world(Arc::clone(&sim)).await.unwrap();
        assert_eq!(pool.spawn_points().len(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_vehicle_batch_returns_fewer() {
        let sim = sim(MockConfig::default().with_spawn_row(3, 20.0));
        let mut pool = bound_pool(&sim).await;

        let actors = pool
            .request_new_batch_actors(BatchRequest::new("vehicle.*", 10))
            .await;

        assert!(!actors.is_empty());
        assert!(actors.len() <= 3);
        let valid: Vec<f64> = sim.config().spawn_points.iter().map(|p| p.location.x).collect();
        for actor in &actors {
            assert!(pool.actor_id_exists(actor.id));
            let here = sim.as_ref().actor_location(actor.id).await.unwrap();
            assert!(valid.iter().any(|x| (x - here.x).abs() < 1e-9));
            assert_eq!(here.y, 0.0);
        }
    }

    #[tokio::test]
    async fn test_walker_batch_without_navigation_is_empty() {
        let sim = sim(MockConfig::default().with_spawn_row(3, 20.0));
        let mut pool = bound_pool(&sim).await;

        let actors = pool
            .request_new_batch_actors(BatchRequest::new("walker.pedestrian.*", 4))
            .await;
        assert!(actors.is_empty());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_walker_batch_attaches_controllers() {
        let sim = sim(MockConfig::default().with_navigation_row(8, 5.0));
        let mut pool = bound_pool(&sim).await;

        let walkers = pool
            .request_new_batch_actors(BatchRequest::new("walker.pedestrian.*", 3))
            .await;
        assert!(!walkers.is_empty());

        for walker in &walkers {
            let controller = pool.controller_of(walker.id).unwrap();
            let state = sim.controller_state(controller).unwrap();
            assert!(state.running);
            assert!(state.destination.is_some());
            assert!((1.0..=2.0).contains(&state.max_speed));
        }

        pool.cleanup().await;
        assert_eq!(sim.actor_count(), 0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{roles, Vector3D};
    use data_provider::{ActorRequest, BatchRequest, MockConfig, ScenarioContext};

    use super::support::{pose, sim};

    const CONFIG: &str = r#"
[spawn]
seed = 99
hero_clearance = 5.0

[barrier]
timeout_ms = 1000
"#;

    /// Config file -> context -> hero + traffic -> ticks -> cleanup
    #[tokio::test]
    async fn test_config_to_scenario() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let sim = sim(MockConfig::default().with_spawn_row(10, 10.0));

        let mut ctx = ScenarioContext::new(&config);
        ctx.bind(Arc::clone(&sim)).await.unwrap();

        let hero = ctx
            .spawn_tracked(
                ActorRequest::new("vehicle.tesla.model3", pose(0.0, 0.0, 0.0)).role_name(roles::HERO),
            )
            .await
            .unwrap()
            .unwrap();
        let traffic = ctx
            .spawn_batch_tracked(BatchRequest::new("vehicle.*", 20).autopilot(true))
            .await
            .unwrap();

        // the hero's own point is skipped, the rest are used once each
        assert!(traffic.len() <= 9);
        assert!(traffic.iter().all(|a| a.id != hero.id));
        assert_eq!(ctx.pool.len(), 1 + traffic.len());
        assert!(traffic
            .iter()
            .all(|a| sim.autopilot_enabled(a.id) == Some(true)));

        sim.set_velocity(hero.id, Vector3D::new(0.0, 8.0, 0.0));
        let first = ctx.step().await.unwrap();
        let second = ctx.step().await.unwrap();
        assert_eq!(second, first + 1);
        assert!((ctx.provider.get_velocity(hero.id) - 8.0).abs() < 1e-9);

        ctx.cleanup().await;
        assert_eq!(sim.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_independent_contexts_run_concurrently() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();

        let run = |spawn_points: usize| {
            let config = config.clone();
            async move {
                let sim = sim(MockConfig::default().with_spawn_row(spawn_points, 10.0));
                let mut ctx = ScenarioContext::new(&config);
                ctx.bind(Arc::clone(&sim)).await.unwrap();
                let actors = ctx
                    .spawn_batch_tracked(BatchRequest::new("vehicle.*", spawn_points))
                    .await
                    .unwrap();
                (actors.len(), sim.actor_count())
            }
        };

        let (a, b) = tokio::join!(run(2), run(5));
        assert_eq!(a, (2, 2));
        assert_eq!(b, (5, 5));
    }
}
