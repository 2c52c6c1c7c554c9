//! CarlaDataProvider - cached world view
//!
//! Owns the world binding, the actor state cache, the traffic-light
//! registry and the ego route. Telemetry getters never fail; registration
//! and world-dependent operations return `ProviderError`.

use std::sync::Arc;

use contracts::{
    ActorHandle, ActorId, GroupAnnotations, LightStateOverrides, Location, MapInfo, ResetRecord,
    Route, TrafficLightConfig, Transform,
};
use tracing::{debug, info, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};
use crate::state_cache::{CachedState, StateCache};
use crate::traffic_lights::{
    annotate_lights, last_waypoint_before_junction, TrafficLightEntry, TrafficLightRegistry,
};

/// Cached world view
pub struct CarlaDataProvider<C> {
    world: Option<Arc<C>>,
    sync_mode: bool,
    map: Option<MapInfo>,
    cache: StateCache,
    lights: TrafficLightRegistry,
    route: Option<Route>,
    config: TrafficLightConfig,
}

impl<C: SimulatorClient> CarlaDataProvider<C> {
    pub fn new(config: TrafficLightConfig) -> Self {
        Self {
            world: None,
            sync_mode: false,
            map: None,
            cache: StateCache::new(),
            lights: TrafficLightRegistry::new(),
            route: None,
            config,
        }
    }

    // ===== World binding =====

    /// Bind the world, capture its sync flag and resolve the map
    #[instrument(name = "provider_set_world", skip(self, world))]
    pub async fn set_world(&mut self, world: Arc<C>) -> Result<()> {
        let settings = world.world_settings().await?;
        let map = world.get_map().await?;

        self.sync_mode = settings.synchronous_mode;
        info!(
            map = %map.name,
            synchronous = settings.synchronous_mode,
            spawn_points = map.spawn_points.len(),
            "world bound"
        );
        self.map = Some(map);
        self.world = Some(world);
        Ok(())
    }

    pub fn get_world(&self) -> Option<&Arc<C>> {
        self.world.as_ref()
    }

    pub fn is_sync_mode(&self) -> bool {
        self.sync_mode
    }

    /// Cached map; resolved from the world on first use unless supplied
    pub async fn get_map(&mut self, explicit: Option<MapInfo>) -> Result<&MapInfo> {
        if let Some(map) = explicit {
            self.map = Some(map);
        } else if self.map.is_none() {
            let world = Arc::clone(self.bound_world("get_map")?);
            self.map = Some(world.get_map().await?);
        }

        self.map
            .as_ref()
            .ok_or(ProviderError::UnboundWorld { operation: "get_map" })
    }

    fn bound_world(&self, operation: &'static str) -> Result<&Arc<C>> {
        self.world
            .as_ref()
            .ok_or(ProviderError::UnboundWorld { operation })
    }

    // ===== State cache =====

    pub fn register_actor(&mut self, actor: &ActorHandle) -> Result<()> {
        self.cache.register(actor)
    }

    /// Register in order; stops at the first duplicate
    pub fn register_actors(&mut self, actors: &[ActorHandle]) -> Result<()> {
        self.cache.register_many(actors)
    }

    /// Refresh every registered actor. Call once per simulation step.
    pub async fn on_tick(&mut self) -> Result<()> {
        let world = Arc::clone(self.bound_world("on_tick")?);
        let updated = self.cache.refresh(world.as_ref()).await;
        observability::metrics::record_tick(self.cache.len());
        debug!(updated, registered = self.cache.len(), "state cache refreshed");
        Ok(())
    }

    /// Planar speed; 0.0 for unknown actors
    pub fn get_velocity(&self, actor_id: ActorId) -> f64 {
        self.cache.velocity(actor_id)
    }

    pub fn get_location(&self, actor_id: ActorId) -> Option<Location> {
        self.cache.location(actor_id)
    }

    pub fn get_transform(&self, actor_id: ActorId) -> Option<Transform> {
        self.cache.transform(actor_id)
    }

    /// Distinguishes a never-registered actor (`None`) from a stale record
    pub fn cached_state(&self, actor_id: ActorId) -> Option<&CachedState> {
        self.cache.cached_state(actor_id)
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.cache
    }

    // ===== Traffic lights =====

    /// Bind the map if needed and rebuild the light registry
    #[instrument(name = "provider_prepare_map", skip(self))]
    pub async fn prepare_map(&mut self) -> Result<usize> {
        if self.map.is_none() {
            self.get_map(None).await?;
        }
        let world = Arc::clone(self.bound_world("prepare_map")?);
        let count = self.lights.rebuild(world.as_ref(), &self.config.filter).await?;
        observability::metrics::record_traffic_lights(count);
        Ok(count)
    }

    pub fn traffic_lights(&self) -> &TrafficLightRegistry {
        &self.lights
    }

    /// Bucket the lights of `light`'s intersection group relative to `light`
    pub async fn annotate_group(&self, light: ActorId) -> Result<GroupAnnotations> {
        let world = self.bound_world("annotate_group")?;
        let group = world.group_traffic_lights(light).await?;

        let reference = match group.iter().find(|l| l.id == light) {
            Some(info) => info.clone(),
            None => world.traffic_light_info(light).await?.ok_or_else(|| {
                ProviderError::simulator(format!("actor {light} is not a traffic light"))
            })?,
        };
        Ok(annotate_lights(&reference, &group))
    }

    /// Override light phases; `timeout` defaults to the configured freeze timeout
    pub async fn update_light_states(
        &self,
        ego_light: Option<ActorId>,
        annotations: &GroupAnnotations,
        overrides: &LightStateOverrides,
        freeze: bool,
        timeout: Option<f64>,
    ) -> Result<Vec<ResetRecord>> {
        let world = self.bound_world("update_light_states")?;
        let timeout = timeout.unwrap_or(self.config.freeze_timeout);
        crate::traffic_lights::update_light_states(
            world.as_ref(),
            ego_light,
            annotations,
            overrides,
            freeze,
            timeout,
        )
        .await
    }

    pub async fn reset_lights(&self, records: &[ResetRecord]) -> Result<()> {
        let world = self.bound_world("reset_lights")?;
        crate::traffic_lights::reset_lights(world.as_ref(), records).await
    }

    /// Light controlling the junction ahead of `actor_id`.
    ///
    /// `None` if the actor is already inside a junction, no light has a
    /// trigger volume, or (with `use_cached_location`) the actor has no
    /// cached location yet.
    #[instrument(name = "provider_next_traffic_light", skip(self))]
    pub async fn get_next_traffic_light(
        &mut self,
        actor_id: ActorId,
        use_cached_location: bool,
    ) -> Result<Option<TrafficLightEntry>> {
        self.prepare_map().await?;
        let world = Arc::clone(self.bound_world("get_next_traffic_light")?);

        let location = if use_cached_location {
            match self.cache.location(actor_id) {
                Some(location) => location,
                None => {
                    warn!(actor_id, "no cached location, cannot look ahead");
                    return Ok(None);
                }
            }
        } else {
            world.actor_location(actor_id).await?
        };

        let last = last_waypoint_before_junction(
            world.as_ref(),
            &location,
            self.config.lookahead_step,
            self.config.max_lookahead_steps,
        )
        .await?;

        let Some(waypoint) = last else {
            debug!(actor_id, "actor already inside a junction");
            return Ok(None);
        };
        Ok(self.lights.nearest_to(&waypoint.transform.location).cloned())
    }

    // ===== Route =====

    pub fn set_ego_vehicle_route(&mut self, route: Route) {
        debug!(ego = route.ego, waypoints = route.len(), "ego route set");
        self.route = Some(route);
    }

    pub fn get_ego_vehicle_route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Drop every cached value and the world binding
    pub fn cleanup(&mut self) {
        self.cache.clear();
        self.lights.clear();
        self.map = None;
        self.world = None;
        self.sync_mode = false;
        self.route = None;
        info!("data provider cleaned up");
    }
}

impl<C: SimulatorClient> Default for CarlaDataProvider<C> {
    fn default() -> Self {
        Self::new(TrafficLightConfig::default())
    }
}
