//! CarlaActorPool 核心实现
//!
//! 管理 scenario 创建的 actors：单个/批量 spawn、按 id 或范围销毁、整体清理。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use contracts::{
    roles, ActorHandle, ActorId, BarrierConfig, Blueprint, Location, SpawnConfig, Transform,
    VehicleCategory,
};
use observability::metrics::{record_actor_destroyed, record_actor_spawned, record_pool_size};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, instrument, warn};

use crate::barrier::FrameBarrier;
use crate::batch::{make_mortal, set_role, BatchRequest, BatchSpawner};
use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};
use crate::spawn_points::SpawnPointAllocator;

/// Fallback pattern for categories without a default blueprint
const ANY_VEHICLE: &str = "vehicle.*";

/// Single-actor creation request
#[derive(Debug, Clone)]
pub struct ActorRequest {
    /// Blueprint pattern
    pub model: String,
    pub spawn_point: Transform,
    pub role_name: String,
    /// Informational only; the role comes from `role_name`
    pub hero: bool,
    pub autopilot: bool,
    pub random_location: bool,
    /// Applied only when the blueprint's `color` is modifiable
    pub color: Option<String>,
    /// Picks the fallback blueprint when `model` matches nothing
    pub category: VehicleCategory,
}

impl ActorRequest {
    pub fn new(model: impl Into<String>, spawn_point: Transform) -> Self {
        Self {
            model: model.into(),
            spawn_point,
            role_name: roles::SCENARIO.to_string(),
            hero: false,
            autopilot: false,
            random_location: false,
            color: None,
            category: VehicleCategory::default(),
        }
    }

    pub fn role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = role_name.into();
        self
    }

    pub fn hero(mut self, hero: bool) -> Self {
        self.hero = hero;
        self
    }

    pub fn autopilot(mut self, autopilot: bool) -> Self {
        self.autopilot = autopilot;
        self
    }

    pub fn random_location(mut self, random_location: bool) -> Self {
        self.random_location = random_location;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn category(mut self, category: VehicleCategory) -> Self {
        self.category = category;
        self
    }

    /// Autopilot overrides the explicit role
    fn effective_role(&self) -> &str {
        if self.autopilot {
            roles::AUTOPILOT
        } else {
            &self.role_name
        }
    }
}

/// Actor Pool
///
/// 持有每个存活 actor 的 handle（按 `ActorId` 索引），以及批量 spawn 时
/// 附加到 walker 上的 controller。
pub struct CarlaActorPool<C> {
    world: Option<Arc<C>>,
    client: Option<Arc<C>>,
    actors: BTreeMap<ActorId, ActorHandle>,
    /// walker -> controller
    controllers: HashMap<ActorId, ActorId>,
    allocator: SpawnPointAllocator,
    rng: StdRng,
    config: SpawnConfig,
    barrier: FrameBarrier,
}

impl<C: SimulatorClient> CarlaActorPool<C> {
    /// 创建新的 CarlaActorPool
    pub fn new(config: SpawnConfig, barrier: &BarrierConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            world: None,
            client: None,
            actors: BTreeMap::new(),
            controllers: HashMap::new(),
            allocator: SpawnPointAllocator::new(),
            rng,
            config,
            barrier: FrameBarrier::new(barrier),
        }
    }

    // ===== Binding =====

    /// Channel used for atomic batches; the world is used when unset
    pub fn set_client(&mut self, client: Arc<C>) {
        self.client = Some(client);
    }

    /// Bind the world and regenerate spawn points
    pub async fn set_world(&mut self, world: Arc<C>) -> Result<()> {
        self.world = Some(world);
        self.generate_spawn_points().await?;
        Ok(())
    }

    /// Reload and reshuffle the map's spawn points
    pub async fn generate_spawn_points(&mut self) -> Result<usize> {
        let world = Arc::clone(self.bound_world("generate_spawn_points")?);
        let map = world.get_map().await?;
        self.allocator.bind(map.spawn_points, &mut self.rng);
        Ok(self.allocator.len())
    }

    fn bound_world(&self, operation: &'static str) -> Result<&Arc<C>> {
        self.world
            .as_ref()
            .ok_or(ProviderError::UnboundWorld { operation })
    }

    pub fn spawn_points(&self) -> &SpawnPointAllocator {
        &self.allocator
    }

    // ===== Single actor =====

    /// Spawn one actor and wait until the next step has committed it.
    ///
    /// Nothing is left behind in the simulator when this fails.
    #[instrument(
        name = "actor_pool_setup_actor",
        skip(self, request),
        fields(model = %request.model, random_location = request.random_location)
    )]
    pub async fn setup_actor(&mut self, request: &ActorRequest) -> Result<ActorHandle> {
        let world = Arc::clone(self.bound_world("setup_actor")?);

        let mut blueprint = self.resolve_blueprint(world.as_ref(), request).await?;
        if let Some(color) = &request.color {
            if blueprint.is_modifiable("color") {
                blueprint.set_attribute("color", color.as_str())?;
            } else {
                debug!(blueprint = %blueprint.id, "blueprint has no modifiable color, skipping");
            }
        }
        make_mortal(&mut blueprint);
        set_role(&mut blueprint, request.effective_role());

        let (actor, tried) = if request.random_location {
            let actor = self.spawn_at_random(world.as_ref(), &blueprint).await?;
            let tried = format!(
                "no free random spawn point after {} attempts",
                self.config.max_random_attempts
            );
            (actor, tried)
        } else {
            let lifted = Transform::new(
                request.spawn_point.location.lifted(self.config.ground_lift),
                request.spawn_point.rotation,
            );
            let actor = world.try_spawn_actor(&blueprint, &lifted).await?;
            (actor, format!("unable to spawn at {:?}", lifted.location))
        };

        let Some(actor) = actor else {
            return Err(ProviderError::spawn_failure(&request.model, tried));
        };

        if let Err(e) = self.commit_spawn(world.as_ref(), &actor, request.autopilot).await {
            self.destroy_actor_safe(actor.id).await;
            return Err(e);
        }

        info!(actor_id = actor.id, type_id = %actor.type_id, role = ?actor.role_name(), "actor spawned");
        Ok(actor)
    }

    async fn resolve_blueprint(&mut self, world: &C, request: &ActorRequest) -> Result<Blueprint> {
        let candidates = world.filter_blueprints(&request.model).await?;
        if let Some(blueprint) = candidates.choose(&mut self.rng) {
            return Ok(blueprint.clone());
        }

        let fallback = self
            .config
            .default_blueprint_for(request.category)
            .unwrap_or(ANY_VEHICLE)
            .to_string();
        warn!(
            model = %request.model,
            category = ?request.category,
            fallback = %fallback,
            "actor model not available, using category default"
        );

        world
            .filter_blueprints(&fallback)
            .await?
            .choose(&mut self.rng)
            .cloned()
            .ok_or(ProviderError::BlueprintNotFound { pattern: fallback })
    }

    async fn spawn_at_random(
        &mut self,
        world: &C,
        blueprint: &Blueprint,
    ) -> Result<Option<ActorHandle>> {
        for attempt in 1..=self.config.max_random_attempts {
            let Some(point) = self.allocator.random_point(&mut self.rng) else {
                warn!("no spawn points available for random placement");
                return Ok(None);
            };
            if let Some(actor) = world.try_spawn_actor(blueprint, &point).await? {
                debug!(attempt, "random placement succeeded");
                return Ok(Some(actor));
            }
        }
        warn!(
            attempts = self.config.max_random_attempts,
            "every random spawn point was occupied"
        );
        Ok(None)
    }

    /// Hand vehicles to the autopilot, then wait for the next step
    async fn commit_spawn(&self, world: &C, actor: &ActorHandle, autopilot: bool) -> Result<()> {
        if actor.is_vehicle() {
            world.set_autopilot(actor.id, autopilot).await?;
        }
        if world.world_settings().await?.synchronous_mode {
            world.tick().await?;
        } else {
            world.wait_for_tick().await?;
        }
        Ok(())
    }

    /// Set up one actor and add it to the pool; `None` on failure
    pub async fn request_new_actor(&mut self, request: ActorRequest) -> Option<ActorHandle> {
        match self.setup_actor(&request).await {
            Ok(actor) => {
                self.insert(actor.clone());
                Some(actor)
            }
            Err(e) => {
                error!(model = %request.model, error = %e, "actor request failed");
                None
            }
        }
    }

    // ===== Batches =====

    /// Spawn a batch; controllers are tracked, actors are returned unpooled
    pub async fn setup_batch_actors(&mut self, request: &BatchRequest) -> Result<Vec<ActorHandle>> {
        let world = Arc::clone(self.bound_world("setup_batch_actors")?);
        let client = Arc::clone(self.client.as_ref().unwrap_or(&world));

        let hero_location = if request.hero {
            None
        } else {
            self.hero_location(world.as_ref()).await
        };

        let outcome = BatchSpawner {
            world: world.as_ref(),
            client: client.as_ref(),
            allocator: &mut self.allocator,
            rng: &mut self.rng,
            config: &self.config,
            barrier: &self.barrier,
        }
        .run(request, hero_location)
        .await?;

        self.controllers.extend(outcome.controllers.iter().copied());
        Ok(outcome.actors)
    }

    /// Spawn a batch and pool every materialized actor; empty on failure
    pub async fn request_new_batch_actors(&mut self, request: BatchRequest) -> Vec<ActorHandle> {
        match self.setup_batch_actors(&request).await {
            Ok(actors) => {
                for actor in &actors {
                    self.insert(actor.clone());
                }
                actors
            }
            Err(e) => {
                error!(model = %request.model, count = request.count, error = %e, "batch request failed");
                Vec::new()
            }
        }
    }

    async fn hero_location(&self, world: &C) -> Option<Location> {
        let hero = self.get_hero_actor()?;
        match world.actor_location(hero.id).await {
            Ok(location) => Some(location),
            Err(e) => {
                warn!(hero = hero.id, error = %e, "hero location unavailable");
                None
            }
        }
    }

    fn insert(&mut self, actor: ActorHandle) {
        record_actor_spawned(actor.kind());
        self.actors.insert(actor.id, actor);
        record_pool_size(self.actors.len());
    }

    // ===== Queries =====

    /// First pooled actor whose role is `hero`
    pub fn get_hero_actor(&self) -> Option<&ActorHandle> {
        self.actors.values().find(|a| a.is_hero())
    }

    pub fn get_actor_by_id(&self, actor_id: ActorId) -> Option<&ActorHandle> {
        let actor = self.actors.get(&actor_id);
        if actor.is_none() {
            warn!(actor_id, "non-existing actor id requested");
        }
        actor
    }

    pub fn actor_id_exists(&self, actor_id: ActorId) -> bool {
        self.actors.contains_key(&actor_id)
    }

    /// Pooled actors in id order
    pub fn get_actors(&self) -> impl Iterator<Item = (ActorId, &ActorHandle)> {
        self.actors.iter().map(|(&id, actor)| (id, actor))
    }

    /// Controller attached to a pooled walker
    pub fn controller_of(&self, walker: ActorId) -> Option<ActorId> {
        self.controllers.get(&walker).copied()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    // ===== Removal =====

    /// Destroy and unpool one actor; returns whether it was pooled
    #[instrument(name = "actor_pool_remove_actor", skip(self))]
    pub async fn remove_actor_by_id(&mut self, actor_id: ActorId) -> bool {
        let Some(actor) = self.actors.remove(&actor_id) else {
            warn!(actor_id, "trying to remove a non-existing actor id");
            return false;
        };
        self.release(actor).await;
        record_pool_size(self.actors.len());
        true
    }

    /// Destroy every pooled actor whose live location is closer than `radius`
    #[instrument(name = "actor_pool_remove_in_surrounding", skip(self))]
    pub async fn remove_actors_in_surrounding(&mut self, location: Location, radius: f64) -> usize {
        let Ok(world) = self.bound_world("remove_actors_in_surrounding").cloned() else {
            warn!("world not bound, nothing removed");
            return 0;
        };

        let ids: Vec<ActorId> = self.actors.keys().copied().collect();
        let mut removed = 0;
        for actor_id in ids {
            let here = match world.actor_location(actor_id).await {
                Ok(here) => here,
                Err(e) => {
                    debug!(actor_id, error = %e, "location unavailable, keeping actor");
                    continue;
                }
            };
            if here.distance(&location) < radius {
                if let Some(actor) = self.actors.remove(&actor_id) {
                    self.release(actor).await;
                    removed += 1;
                }
            }
        }

        record_pool_size(self.actors.len());
        info!(removed, remaining = self.actors.len(), "actors in surrounding removed");
        removed
    }

    /// Destroy everything and unbind
    #[instrument(name = "actor_pool_cleanup", skip(self), fields(actors = self.actors.len()))]
    pub async fn cleanup(&mut self) {
        let actors = std::mem::take(&mut self.actors);
        for actor in actors.into_values() {
            self.release(actor).await;
        }
        // controllers whose walker was never pooled
        let orphans: Vec<ActorId> = self.controllers.drain().map(|(_, c)| c).collect();
        for controller in orphans {
            self.destroy_actor_safe(controller).await;
        }

        self.world = None;
        self.client = None;
        self.allocator.reset();
        record_pool_size(0);
        info!("actor pool cleaned up");
    }

    /// Stop and destroy the walker's controller, then the actor itself
    async fn release(&mut self, actor: ActorHandle) {
        if let Some(controller) = self.controllers.remove(&actor.id) {
            if let Some(world) = &self.world {
                if let Err(e) = world.stop_walker_controller(controller).await {
                    debug!(controller, error = %e, "failed to stop walker controller");
                }
            }
            self.destroy_actor_safe(controller).await;
        }
        self.destroy_actor_safe(actor.id).await;
        record_actor_destroyed(actor.kind());
    }

    /// 安全销毁 actor（忽略错误，仅记录日志）
    async fn destroy_actor_safe(&self, actor_id: ActorId) {
        let Some(world) = &self.world else {
            warn!(actor_id, "world not bound, cannot destroy actor");
            return;
        };

        match world.destroy_actor(actor_id).await {
            Ok(true) => debug!(actor_id, "actor destroyed"),
            Ok(false) => debug!(actor_id, "actor already gone"),
            Err(e) => error!(actor_id, error = %e, "failed to destroy actor"),
        }
    }
}
