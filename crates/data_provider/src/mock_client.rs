//! Mock simulator
//!
//! In-process world used by unit tests, integration tests and the CLI dry
//! harness. Supports failure injection (rejected poses, controller attach
//! failures, lagging or stalled snapshots).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    ActorHandle, ActorId, BatchCommand, Blueprint, BlueprintAttribute, BoundingBox,
    CommandResponse, FollowUp, LightTiming, Location, MapInfo, Rotation, TrafficLightInfo,
    TrafficLightState, Transform, Vector3D, Waypoint, WorldSettings, WALKER_CONTROLLER_BLUEPRINT,
};
use tracing::{debug, instrument};

use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};

/// Type id given to traffic-light actors
pub const TRAFFIC_LIGHT_TYPE: &str = "traffic.traffic_light";

/// Lateral tolerance when snapping a location onto a lane
const LANE_HALF_WIDTH: f64 = 2.0;

/// Mock simulator configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Reported in world settings
    pub synchronous_mode: bool,
    pub fixed_delta_seconds: f64,
    pub map_name: String,
    pub spawn_points: Vec<Transform>,
    /// Blueprint catalog
    pub blueprints: Vec<Blueprint>,
    /// Navigation-mesh samples, handed out round-robin
    pub navigation_points: Vec<Location>,
    /// Spawns closer than this (2D) to an existing body are rejected
    pub collision_radius: f64,
    /// Spawns within `collision_radius` of these poses always fail
    pub rejected_locations: Vec<Location>,
    /// Every walker-controller attach fails
    pub fail_controller_attach: bool,
    /// Snapshot frame trails the real frame for this many polls after a tick
    pub snapshot_lag_polls: u32,
    /// Snapshot frame never advances
    pub stall_snapshot: bool,
    /// Snapshot frame reports this many frames ahead
    pub snapshot_overshoot: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            synchronous_mode: true,
            fixed_delta_seconds: 0.05,
            map_name: "Town01".to_string(),
            spawn_points: Vec::new(),
            blueprints: default_catalog(),
            navigation_points: Vec::new(),
            collision_radius: 1.0,
            rejected_locations: Vec::new(),
            fail_controller_attach: false,
            snapshot_lag_polls: 0,
            stall_snapshot: false,
            snapshot_overshoot: 0,
        }
    }
}

impl MockConfig {
    /// Spawn points spaced `spacing` metres apart along the x axis
    pub fn with_spawn_row(mut self, count: usize, spacing: f64) -> Self {
        self.spawn_points = (0..count)
            .map(|i| {
                Transform::new(
                    Location::new(i as f64 * spacing, 0.0, 0.0),
                    Rotation::default(),
                )
            })
            .collect();
        self
    }

    /// Navigation points spaced `spacing` metres apart along y = 50
    pub fn with_navigation_row(mut self, count: usize, spacing: f64) -> Self {
        self.navigation_points = (0..count)
            .map(|i| Location::new(i as f64 * spacing, 50.0, 0.0))
            .collect();
        self
    }
}

/// Default blueprint catalog: a few vehicles, walkers and the walker controller
pub fn default_catalog() -> Vec<Blueprint> {
    let vehicle = |id: &str| {
        Blueprint::new(id)
            .with_attribute("role_name", BlueprintAttribute::modifiable("autopilot"))
            .with_attribute("color", BlueprintAttribute::modifiable("0,0,0"))
            .with_attribute("number_of_wheels", BlueprintAttribute::fixed("4"))
    };
    let walker = |id: &str| {
        Blueprint::new(id)
            .with_attribute("role_name", BlueprintAttribute::modifiable("pedestrian"))
            .with_attribute("is_invincible", BlueprintAttribute::modifiable("true"))
            .with_attribute(
                "speed",
                BlueprintAttribute::modifiable("1.4").with_recommended(&["0.0", "1.4", "2.8"]),
            )
    };

    vec![
        vehicle("vehicle.tesla.model3"),
        vehicle("vehicle.audi.tt"),
        vehicle("vehicle.volkswagen.t2"),
        vehicle("vehicle.carlamotors.carlacola"),
        vehicle("vehicle.kawasaki.ninja"),
        // bicycles cannot be recoloured
        Blueprint::new("vehicle.diamondback.century")
            .with_attribute("role_name", BlueprintAttribute::modifiable("autopilot"))
            .with_attribute("number_of_wheels", BlueprintAttribute::fixed("2")),
        walker("walker.pedestrian.0001"),
        walker("walker.pedestrian.0002"),
        Blueprint::new(WALKER_CONTROLLER_BLUEPRINT)
            .with_attribute("role_name", BlueprintAttribute::modifiable("")),
    ]
}

/// Straight lane segment of the mock road network
#[derive(Debug, Clone)]
pub struct MockLane {
    pub road_id: u32,
    pub lane_id: i32,
    pub start: Location,
    /// Heading in degrees
    pub yaw: f64,
    pub length: f64,
    /// Distance from `start` at which the junction begins
    pub junction_start: f64,
}

impl MockLane {
    fn direction(&self) -> (f64, f64) {
        let (s, c) = self.yaw.to_radians().sin_cos();
        (c, s)
    }

    /// (s, lateral offset) of a location projected onto the lane
    fn project(&self, location: &Location) -> (f64, f64) {
        let (dx, dy) = self.direction();
        let px = location.x - self.start.x;
        let py = location.y - self.start.y;
        (px * dx + py * dy, (px * dy - py * dx).abs())
    }

    fn waypoint_at_s(&self, s: f64) -> Waypoint {
        let (dx, dy) = self.direction();
        Waypoint {
            road_id: self.road_id,
            lane_id: self.lane_id,
            s,
            transform: Transform::new(
                Location::new(self.start.x + dx * s, self.start.y + dy * s, self.start.z),
                Rotation::from_yaw(self.yaw),
            ),
            is_intersection: s >= self.junction_start,
        }
    }
}

/// Traffic light to place in the mock world
#[derive(Debug, Clone)]
pub struct MockTrafficLight {
    pub transform: Transform,
    pub trigger_volume: Option<BoundingBox>,
    /// Intersection group
    pub group: u32,
    pub timing: LightTiming,
}

impl MockTrafficLight {
    /// Red light with a small trigger volume 5 m in front of the pole
    pub fn new(transform: Transform, group: u32) -> Self {
        Self {
            transform,
            trigger_volume: Some(BoundingBox {
                location: Location::new(5.0, 0.0, 0.0),
                extent: Vector3D::new(1.0, 1.5, 1.0),
            }),
            group,
            timing: LightTiming {
                state: TrafficLightState::Red,
                green_time: 10.0,
                red_time: 8.0,
                yellow_time: 2.0,
            },
        }
    }
}

/// Observable state of a walker controller
#[derive(Debug, Clone, PartialEq)]
pub struct MockControllerState {
    pub walker: ActorId,
    pub running: bool,
    pub destination: Option<Location>,
    pub max_speed: f64,
}

#[derive(Debug, Clone)]
struct MockActor {
    handle: ActorHandle,
    transform: Transform,
    velocity: Vector3D,
    autopilot: bool,
}

#[derive(Debug, Clone)]
struct MockLight {
    group: u32,
    trigger_volume: Option<BoundingBox>,
    timing: LightTiming,
}

#[derive(Debug, Default)]
struct MockWorld {
    frame: u64,
    visible_frame: u64,
    lag_remaining: u32,
    actors: BTreeMap<ActorId, MockActor>,
    lights: BTreeMap<ActorId, MockLight>,
    controllers: BTreeMap<ActorId, MockControllerState>,
    lanes: Vec<MockLane>,
    cross_factor: f64,
    nav_cursor: usize,
    batches_applied: usize,
}

/// Mock simulator
pub struct MockSimulator {
    /// Configuration (can inject failure scenarios)
    config: MockConfig,
    /// Actor ID counter
    next_actor_id: AtomicU32,
    world: Mutex<MockWorld>,
}

impl MockSimulator {
    /// Create default mock simulator
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create mock simulator with configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            next_actor_id: AtomicU32::new(1000), // start at 1000 for easy recognition
            world: Mutex::new(MockWorld::default()),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    fn world(&self) -> MutexGuard<'_, MockWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    // ===== World building (test setup) =====

    /// Add a lane segment to the road network
    pub fn add_lane(&self, lane: MockLane) {
        self.world().lanes.push(lane);
    }

    /// Place a traffic light; returns its actor id
    pub fn add_traffic_light(&self, light: MockTrafficLight) -> ActorId {
        let id = self.allocate_actor_id();
        let mut world = self.world();
        world.actors.insert(
            id,
            MockActor {
                handle: ActorHandle::new(id, TRAFFIC_LIGHT_TYPE),
                transform: light.transform,
                velocity: Vector3D::default(),
                autopilot: false,
            },
        );
        world.lights.insert(
            id,
            MockLight {
                group: light.group,
                trigger_volume: light.trigger_volume,
                timing: light.timing,
            },
        );
        id
    }

    /// Place an actor directly, bypassing collision checks
    pub fn place_actor(&self, handle: ActorHandle, transform: Transform) -> ActorId {
        let id = handle.id;
        self.world().actors.insert(
            id,
            MockActor {
                handle,
                transform,
                velocity: Vector3D::default(),
                autopilot: false,
            },
        );
        id
    }

    /// Allocate an id for a handle placed with `place_actor`
    pub fn next_id(&self) -> ActorId {
        self.allocate_actor_id()
    }

    pub fn set_velocity(&self, actor_id: ActorId, velocity: Vector3D) {
        if let Some(actor) = self.world().actors.get_mut(&actor_id) {
            actor.velocity = velocity;
        }
    }

    pub fn set_transform(&self, actor_id: ActorId, transform: Transform) {
        if let Some(actor) = self.world().actors.get_mut(&actor_id) {
            actor.transform = transform;
        }
    }

    /// Remove an actor as if the simulation had destroyed it
    pub fn kill(&self, actor_id: ActorId) {
        let mut world = self.world();
        world.actors.remove(&actor_id);
        world.lights.remove(&actor_id);
        world.controllers.remove(&actor_id);
    }

    // ===== Inspection =====

    /// Number of live actors
    pub fn actor_count(&self) -> usize {
        self.world().actors.len()
    }

    /// All live actor IDs
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.world().actors.keys().copied().collect()
    }

    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.world().actors.contains_key(&actor_id)
    }

    pub fn autopilot_enabled(&self, actor_id: ActorId) -> Option<bool> {
        self.world().actors.get(&actor_id).map(|a| a.autopilot)
    }

    pub fn controller_state(&self, controller_id: ActorId) -> Option<MockControllerState> {
        self.world().controllers.get(&controller_id).cloned()
    }

    /// Controller attached to a walker, if any
    pub fn controller_for(&self, walker_id: ActorId) -> Option<ActorId> {
        self.world()
            .controllers
            .iter()
            .find(|(_, c)| c.walker == walker_id)
            .map(|(id, _)| *id)
    }

    pub fn cross_factor(&self) -> f64 {
        self.world().cross_factor
    }

    pub fn frame(&self) -> u64 {
        self.world().frame
    }

    pub fn batches_applied(&self) -> usize {
        self.world().batches_applied
    }

    pub fn timing_of(&self, light_id: ActorId) -> Option<LightTiming> {
        self.world().lights.get(&light_id).map(|l| l.timing)
    }

    // ===== Internals =====

    fn advance(&self, world: &mut MockWorld) -> u64 {
        let dt = self.config.fixed_delta_seconds;

        // walkers follow their controllers
        let steering: Vec<(ActorId, Location, f64)> = world
            .controllers
            .values()
            .filter(|c| c.running)
            .filter_map(|c| c.destination.map(|d| (c.walker, d, c.max_speed)))
            .collect();
        for (walker, destination, speed) in steering {
            if let Some(actor) = world.actors.get_mut(&walker) {
                let here = actor.transform.location;
                let remaining = here.distance_2d(&destination);
                actor.velocity = if remaining > 1e-6 {
                    let scale = speed / remaining;
                    Vector3D::new(
                        (destination.x - here.x) * scale,
                        (destination.y - here.y) * scale,
                        0.0,
                    )
                } else {
                    Vector3D::default()
                };
            }
        }

        for actor in world.actors.values_mut() {
            actor.transform.location.x += actor.velocity.x * dt;
            actor.transform.location.y += actor.velocity.y * dt;
            actor.transform.location.z += actor.velocity.z * dt;
        }

        world.frame += 1;
        if !self.config.stall_snapshot {
            if self.config.snapshot_lag_polls == 0 {
                world.visible_frame = world.frame + self.config.snapshot_overshoot;
            } else {
                world.lag_remaining = self.config.snapshot_lag_polls;
            }
        }
        world.frame
    }

    fn is_blocked(&self, world: &MockWorld, location: &Location) -> bool {
        let radius = self.config.collision_radius;
        if self
            .config
            .rejected_locations
            .iter()
            .any(|r| r.distance_2d(location) < radius)
        {
            return true;
        }
        world.actors.values().any(|a| {
            (a.handle.is_vehicle() || a.handle.is_walker())
                && a.transform.location.distance_2d(location) < radius
        })
    }

    fn spawn_locked(
        &self,
        world: &mut MockWorld,
        blueprint: &Blueprint,
        transform: &Transform,
        parent: Option<ActorId>,
    ) -> std::result::Result<ActorHandle, String> {
        let is_controller = blueprint.id.is_controller();

        let transform = match parent {
            Some(parent_id) => {
                let parent_actor = world
                    .actors
                    .get(&parent_id)
                    .ok_or_else(|| format!("parent actor {parent_id} not found"))?;
                if is_controller && self.config.fail_controller_attach {
                    return Err("mock controller attach failure".to_string());
                }
                parent_actor.transform
            }
            None => {
                if self.is_blocked(world, &transform.location) {
                    return Err("spawn failed because of collision at spawn position".to_string());
                }
                *transform
            }
        };

        let id = self.allocate_actor_id();
        let mut handle = ActorHandle::new(id, blueprint.id.clone());
        for (key, value) in blueprint.attribute_values() {
            handle.attributes.insert(key.to_string(), value.to_string());
        }

        if is_controller {
            if let Some(walker) = parent {
                world.controllers.insert(
                    id,
                    MockControllerState {
                        walker,
                        running: false,
                        destination: None,
                        max_speed: 1.4,
                    },
                );
            }
        }

        world.actors.insert(
            id,
            MockActor {
                handle: handle.clone(),
                transform,
                velocity: Vector3D::default(),
                autopilot: false,
            },
        );
        debug!(actor_id = id, type_id = %blueprint.id, "mock actor spawned");
        Ok(handle)
    }

    fn actor<'w>(world: &'w MockWorld, actor_id: ActorId) -> Result<&'w MockActor> {
        world
            .actors
            .get(&actor_id)
            .ok_or_else(|| ProviderError::simulator(format!("actor {actor_id} not found")))
    }

    fn light_info(world: &MockWorld, light_id: ActorId) -> Option<TrafficLightInfo> {
        let light = world.lights.get(&light_id)?;
        let actor = world.actors.get(&light_id)?;
        Some(TrafficLightInfo {
            id: light_id,
            transform: actor.transform,
            trigger_volume: light.trigger_volume,
        })
    }

    fn light_mut(world: &mut MockWorld, light_id: ActorId) -> Result<&mut MockLight> {
        world
            .lights
            .get_mut(&light_id)
            .ok_or_else(|| ProviderError::simulator(format!("traffic light {light_id} not found")))
    }

    fn controller_mut(
        world: &mut MockWorld,
        controller_id: ActorId,
    ) -> Result<&mut MockControllerState> {
        world
            .controllers
            .get_mut(&controller_id)
            .ok_or_else(|| ProviderError::simulator(format!("controller {controller_id} not found")))
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shell-style wildcard match supporting `*` and `?`
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

impl SimulatorClient for MockSimulator {
    async fn world_settings(&self) -> Result<WorldSettings> {
        Ok(WorldSettings {
            synchronous_mode: self.config.synchronous_mode,
            fixed_delta_seconds: Some(self.config.fixed_delta_seconds),
        })
    }

    async fn get_map(&self) -> Result<MapInfo> {
        Ok(MapInfo {
            name: self.config.map_name.clone(),
            spawn_points: self.config.spawn_points.clone(),
        })
    }

    #[instrument(name = "mock_sim_tick", skip(self))]
    async fn tick(&self) -> Result<u64> {
        let mut world = self.world();
        Ok(self.advance(&mut world))
    }

    async fn wait_for_tick(&self) -> Result<u64> {
        let mut world = self.world();
        Ok(self.advance(&mut world))
    }

    async fn snapshot_frame(&self) -> Result<u64> {
        let mut world = self.world();
        if !self.config.stall_snapshot {
            if world.lag_remaining > 0 {
                world.lag_remaining -= 1;
            } else {
                world.visible_frame = world.frame + self.config.snapshot_overshoot;
            }
        }
        Ok(world.visible_frame)
    }

    async fn get_actor(&self, actor_id: ActorId) -> Result<Option<ActorHandle>> {
        Ok(self.world().actors.get(&actor_id).map(|a| a.handle.clone()))
    }

    async fn get_actors(&self, actor_ids: &[ActorId]) -> Result<Vec<ActorHandle>> {
        let world = self.world();
        Ok(actor_ids
            .iter()
            .filter_map(|id| world.actors.get(id).map(|a| a.handle.clone()))
            .collect())
    }

    async fn filter_actors(&self, pattern: &str) -> Result<Vec<ActorHandle>> {
        Ok(self
            .world()
            .actors
            .values()
            .filter(|a| wildcard_match(pattern, a.handle.type_id.as_str()))
            .map(|a| a.handle.clone())
            .collect())
    }

    async fn is_alive(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.world().actors.contains_key(&actor_id))
    }

    async fn actor_velocity(&self, actor_id: ActorId) -> Result<Vector3D> {
        let world = self.world();
        Ok(Self::actor(&world, actor_id)?.velocity)
    }

    async fn actor_location(&self, actor_id: ActorId) -> Result<Location> {
        let world = self.world();
        Ok(Self::actor(&world, actor_id)?.transform.location)
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        let world = self.world();
        Ok(Self::actor(&world, actor_id)?.transform)
    }

    #[instrument(
        name = "mock_sim_try_spawn_actor",
        skip(self, blueprint, transform),
        fields(blueprint = %blueprint.id)
    )]
    async fn try_spawn_actor(
        &self,
        blueprint: &Blueprint,
        transform: &Transform,
    ) -> Result<Option<ActorHandle>> {
        let mut world = self.world();
        Ok(self.spawn_locked(&mut world, blueprint, transform, None).ok())
    }

    #[instrument(name = "mock_sim_destroy_actor", skip(self))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<bool> {
        let mut world = self.world();
        world.lights.remove(&actor_id);
        world.controllers.remove(&actor_id);
        Ok(world.actors.remove(&actor_id).is_some())
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        let mut world = self.world();
        let actor = world
            .actors
            .get_mut(&actor_id)
            .ok_or_else(|| ProviderError::simulator(format!("actor {actor_id} not found")))?;
        actor.autopilot = enabled;
        Ok(())
    }

    async fn filter_blueprints(&self, pattern: &str) -> Result<Vec<Blueprint>> {
        Ok(self
            .config
            .blueprints
            .iter()
            .filter(|bp| wildcard_match(pattern, bp.id.as_str()))
            .cloned()
            .collect())
    }

    async fn find_blueprint(&self, id: &str) -> Result<Option<Blueprint>> {
        Ok(self.config.blueprints.iter().find(|bp| bp.id == id).cloned())
    }

    async fn waypoint_at(&self, location: &Location) -> Result<Option<Waypoint>> {
        let world = self.world();
        let best = world
            .lanes
            .iter()
            .map(|lane| (lane, lane.project(location)))
            .filter(|(lane, (s, lateral))| {
                *s >= 0.0 && *s <= lane.length && *lateral <= LANE_HALF_WIDTH
            })
            .min_by(|(_, (_, a)), (_, (_, b))| a.total_cmp(b));
        Ok(best.map(|(lane, (s, _))| lane.waypoint_at_s(s)))
    }

    async fn next_waypoints(&self, waypoint: &Waypoint, distance: f64) -> Result<Vec<Waypoint>> {
        let world = self.world();
        let lane = world
            .lanes
            .iter()
            .find(|l| l.road_id == waypoint.road_id && l.lane_id == waypoint.lane_id);
        Ok(match lane {
            Some(lane) if waypoint.s + distance <= lane.length => {
                vec![lane.waypoint_at_s(waypoint.s + distance)]
            }
            _ => Vec::new(),
        })
    }

    async fn traffic_light_info(&self, light_id: ActorId) -> Result<Option<TrafficLightInfo>> {
        Ok(Self::light_info(&self.world(), light_id))
    }

    async fn group_traffic_lights(&self, light_id: ActorId) -> Result<Vec<TrafficLightInfo>> {
        let world = self.world();
        let group = world
            .lights
            .get(&light_id)
            .ok_or_else(|| ProviderError::simulator(format!("traffic light {light_id} not found")))?
            .group;
        Ok(world
            .lights
            .iter()
            .filter(|(_, l)| l.group == group)
            .filter_map(|(id, _)| Self::light_info(&world, *id))
            .collect())
    }

    async fn light_timing(&self, light_id: ActorId) -> Result<LightTiming> {
        let mut world = self.world();
        Ok(Self::light_mut(&mut world, light_id)?.timing)
    }

    async fn set_light_state(&self, light_id: ActorId, state: TrafficLightState) -> Result<()> {
        let mut world = self.world();
        Self::light_mut(&mut world, light_id)?.timing.state = state;
        Ok(())
    }

    async fn set_light_times(
        &self,
        light_id: ActorId,
        green: f64,
        red: f64,
        yellow: f64,
    ) -> Result<()> {
        let mut world = self.world();
        let timing = &mut Self::light_mut(&mut world, light_id)?.timing;
        timing.green_time = green;
        timing.red_time = red;
        timing.yellow_time = yellow;
        Ok(())
    }

    #[instrument(
        name = "mock_sim_apply_batch_sync",
        skip(self, commands),
        fields(commands = commands.len())
    )]
    async fn apply_batch_sync(
        &self,
        commands: Vec<BatchCommand>,
        do_tick: bool,
    ) -> Result<Vec<CommandResponse>> {
        let mut world = self.world();
        let mut responses = Vec::with_capacity(commands.len());

        for command in commands {
            let response = match command {
                BatchCommand::SpawnActor {
                    blueprint,
                    transform,
                    parent,
                    then,
                } => match self.spawn_locked(&mut world, &blueprint, &transform, parent) {
                    Ok(handle) => {
                        if let Some(FollowUp::SetAutopilot(enabled)) = then {
                            if let Some(actor) = world.actors.get_mut(&handle.id) {
                                actor.autopilot = enabled;
                            }
                        }
                        CommandResponse::Spawned(handle.id)
                    }
                    Err(e) => CommandResponse::Failed(e),
                },
                BatchCommand::DestroyActor(actor_id) => {
                    world.lights.remove(&actor_id);
                    world.controllers.remove(&actor_id);
                    match world.actors.remove(&actor_id) {
                        Some(_) => CommandResponse::Applied,
                        None => CommandResponse::Failed(format!("actor {actor_id} not found")),
                    }
                }
            };
            responses.push(response);
        }

        world.batches_applied += 1;
        if do_tick {
            self.advance(&mut world);
        }
        Ok(responses)
    }

    async fn random_navigation_location(&self) -> Result<Option<Location>> {
        let mut world = self.world();
        if self.config.navigation_points.is_empty() {
            return Ok(None);
        }
        let idx = world.nav_cursor % self.config.navigation_points.len();
        world.nav_cursor += 1;
        Ok(Some(self.config.navigation_points[idx]))
    }

    async fn set_pedestrians_cross_factor(&self, factor: f64) -> Result<()> {
        self.world().cross_factor = factor;
        Ok(())
    }

    async fn start_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        let mut world = self.world();
        Self::controller_mut(&mut world, controller_id)?.running = true;
        Ok(())
    }

    async fn stop_walker_controller(&self, controller_id: ActorId) -> Result<()> {
        let mut world = self.world();
        Self::controller_mut(&mut world, controller_id)?.running = false;
        Ok(())
    }

    async fn walker_go_to(&self, controller_id: ActorId, destination: &Location) -> Result<()> {
        let mut world = self.world();
        Self::controller_mut(&mut world, controller_id)?.destination = Some(*destination);
        Ok(())
    }

    async fn set_walker_max_speed(&self, controller_id: ActorId, speed: f64) -> Result<()> {
        let mut world = self.world();
        Self::controller_mut(&mut world, controller_id)?.max_speed = speed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Transform {
        Transform::default()
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("vehicle.*", "vehicle.tesla.model3"));
        assert!(wildcard_match("*traffic_light*", "traffic.traffic_light"));
        assert!(wildcard_match("walker.pedestrian.000?", "walker.pedestrian.0002"));
        assert!(!wildcard_match("vehicle.*", "walker.pedestrian.0001"));
        assert!(wildcard_match("vehicle.tesla.model3", "vehicle.tesla.model3"));
        assert!(!wildcard_match("vehicle.tesla", "vehicle.tesla.model3"));
    }

    #[tokio::test]
    async fn test_mock_spawn_and_collision() {
        let sim = MockSimulator::new();
        let bp = sim.find_blueprint("vehicle.audi.tt").await.unwrap().unwrap();

        let first = sim.try_spawn_actor(&bp, &origin()).await.unwrap();
        assert!(first.is_some());
        assert!(first.unwrap().id >= 1000);

        // same pose is occupied
        let second = sim.try_spawn_actor(&bp, &origin()).await.unwrap();
        assert!(second.is_none());
        assert_eq!(sim.actor_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_destroy_idempotent() {
        let sim = MockSimulator::new();
        let bp = sim.find_blueprint("vehicle.audi.tt").await.unwrap().unwrap();
        let actor = sim.try_spawn_actor(&bp, &origin()).await.unwrap().unwrap();

        assert!(sim.destroy_actor(actor.id).await.unwrap());
        // Second destroy reports absence but does not fail
        assert!(!sim.destroy_actor(actor.id).await.unwrap());
        assert_eq!(sim.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_batch_with_controller() {
        let sim = MockSimulator::new();
        let walker_bp = sim
            .find_blueprint("walker.pedestrian.0001")
            .await
            .unwrap()
            .unwrap();
        let responses = sim
            .apply_batch_sync(vec![BatchCommand::spawn(walker_bp, origin())], false)
            .await
            .unwrap();
        let walker = responses[0].actor_id().unwrap();

        let controller_bp = sim
            .find_blueprint(WALKER_CONTROLLER_BLUEPRINT)
            .await
            .unwrap()
            .unwrap();
        let responses = sim
            .apply_batch_sync(
                vec![BatchCommand::spawn_attached(controller_bp, origin(), walker)],
                false,
            )
            .await
            .unwrap();
        let controller = responses[0].actor_id().unwrap();

        assert_eq!(sim.controller_for(walker), Some(controller));
        assert_eq!(sim.batches_applied(), 2);
    }

    #[tokio::test]
    async fn test_mock_snapshot_lag() {
        let sim = MockSimulator::with_config(MockConfig {
            snapshot_lag_polls: 2,
            ..Default::default()
        });
        let frame = sim.tick().await.unwrap();
        assert_eq!(frame, 1);
        assert_eq!(sim.snapshot_frame().await.unwrap(), 0);
        assert_eq!(sim.snapshot_frame().await.unwrap(), 0);
        assert_eq!(sim.snapshot_frame().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mock_lane_walk() {
        let sim = MockSimulator::new();
        sim.add_lane(MockLane {
            road_id: 1,
            lane_id: -1,
            start: Location::new(0.0, 0.0, 0.0),
            yaw: 0.0,
            length: 20.0,
            junction_start: 10.0,
        });

        let wp = sim
            .waypoint_at(&Location::new(3.0, 0.5, 0.0))
            .await
            .unwrap()
            .unwrap();
        assert!(!wp.is_intersection);
        assert!((wp.s - 3.0).abs() < 1e-9);

        let next = sim.next_waypoints(&wp, 8.0).await.unwrap();
        assert!(next[0].is_intersection);

        let end = sim.next_waypoints(&next[0], 50.0).await.unwrap();
        assert!(end.is_empty());

        assert!(sim
            .waypoint_at(&Location::new(3.0, 10.0, 0.0))
            .await
            .unwrap()
            .is_none());
    }
}
