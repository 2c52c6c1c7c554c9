//! Simulator client abstraction
//!
//! Defines the collaborator capabilities the provider consumes, supporting a
//! real simulator binding and the in-process mock used for testing.

use contracts::{
    ActorHandle, ActorId, BatchCommand, Blueprint, CommandResponse, LightTiming, Location,
    MapInfo, TrafficLightInfo, TrafficLightState, Transform, Vector3D, Waypoint, WorldSettings,
};

use crate::error::Result;

/// Simulator client trait
///
/// Every call may block on a round-trip to the simulator, which is why the
/// provider caches what it can. Actors are addressed by id; a call on an id
/// the simulator no longer knows returns an error (or `None`/`false` where
/// the signature allows it).
#[trait_variant::make(SimulatorClient: Send)]
pub trait LocalSimulatorClient {
    // ===== World =====

    /// Current world settings
    async fn world_settings(&self) -> Result<WorldSettings>;

    /// Static map description
    async fn get_map(&self) -> Result<MapInfo>;

    /// Advance one step (lock-step mode); returns the new frame number
    async fn tick(&self) -> Result<u64>;

    /// Wait for the next step produced by the server; returns its frame number
    async fn wait_for_tick(&self) -> Result<u64>;

    /// Frame number of the latest world snapshot
    async fn snapshot_frame(&self) -> Result<u64>;

    // ===== Actors =====

    /// Look up one actor
    async fn get_actor(&self, actor_id: ActorId) -> Result<Option<ActorHandle>>;

    /// Look up several actors; unknown ids are omitted, order is preserved
    async fn get_actors(&self, actor_ids: &[ActorId]) -> Result<Vec<ActorHandle>>;

    /// All live actors whose type id matches a wildcard pattern
    async fn filter_actors(&self, pattern: &str) -> Result<Vec<ActorHandle>>;

    /// Whether the actor still exists in the simulation
    async fn is_alive(&self, actor_id: ActorId) -> Result<bool>;

    async fn actor_velocity(&self, actor_id: ActorId) -> Result<Vector3D>;

    async fn actor_location(&self, actor_id: ActorId) -> Result<Location>;

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform>;

    /// Spawn an actor; `Ok(None)` when the pose is occupied
    async fn try_spawn_actor(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
    ) -> Result<Option<ActorHandle>>;

    /// Destroy an actor; returns whether it existed
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<bool>;

    /// Hand a vehicle to (or take it from) the traffic manager
    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()>;

    // ===== Blueprints =====

    /// Catalog entries whose id matches a wildcard pattern
    async fn filter_blueprints(&self, pattern: &str) -> Result<Vec<Blueprint>>;

    /// Catalog entry by exact id
    async fn find_blueprint(&self, id: &str) -> Result<Option<Blueprint>>;

    // ===== Map =====

    /// Closest lane waypoint to a location, `None` off-road
    async fn waypoint_at(&self, location: &Location) -> Result<Option<Waypoint>>;

    /// Waypoints `distance` metres ahead; empty at the end of the lane
    async fn next_waypoints(&self, waypoint: &Waypoint, distance: f64) -> Result<Vec<Waypoint>>;

    // ===== Traffic lights =====

    async fn traffic_light_info(&self, light_id: ActorId) -> Result<Option<TrafficLightInfo>>;

    /// Every light in the same intersection group, including `light_id`
    async fn group_traffic_lights(&self, light_id: ActorId) -> Result<Vec<TrafficLightInfo>>;

    async fn light_timing(&self, light_id: ActorId) -> Result<LightTiming>;

    async fn set_light_state(&self, light_id: ActorId, state: TrafficLightState) -> Result<()>;

    /// Set green, red and yellow durations (seconds)
    async fn set_light_times(&self, light_id: ActorId, green: f64, red: f64, yellow: f64)
        -> Result<()>;

    // ===== Batches =====

    /// Apply commands atomically; one response per command, in order.
    /// With `do_tick` the world advances one step after the batch.
    async fn apply_batch_sync(
        &self,
        commands: Vec<BatchCommand>,
        do_tick: bool,
    ) -> Result<Vec<CommandResponse>>;

    // ===== Navigation / walkers =====

    /// Random point on the pedestrian navigation mesh
    async fn random_navigation_location(&self) -> Result<Option<Location>>;

    /// Probability that pedestrians cross roads
    async fn set_pedestrians_cross_factor(&self, factor: f64) -> Result<()>;

    async fn start_walker_controller(&self, controller_id: ActorId) -> Result<()>;

    async fn stop_walker_controller(&self, controller_id: ActorId) -> Result<()>;

    async fn walker_go_to(&self, controller_id: ActorId, destination: &Location) -> Result<()>;

    async fn set_walker_max_speed(&self, controller_id: ActorId, speed: f64) -> Result<()>;
}
