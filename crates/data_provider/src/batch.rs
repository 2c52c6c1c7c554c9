//! Batched spawning
//!
//! Builds one atomic spawn batch, attaches AI controllers to the walkers it
//! produced, advances a single frame behind the frame barrier, then sets the
//! walkers in motion. Individual failures are logged and dropped.

use contracts::{
    roles, ActorHandle, ActorId, BatchCommand, Blueprint, CommandResponse, FollowUp, Location,
    Rotation, SpawnConfig, Transform, ROLE_NAME_ATTRIBUTE, WALKER_CONTROLLER_BLUEPRINT,
};
use observability::metrics::{record_barrier_wait, record_batch_failure};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

use crate::barrier::FrameBarrier;
use crate::client::SimulatorClient;
use crate::error::Result;
use crate::spawn_points::SpawnPointAllocator;

/// Multi-actor creation request
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Blueprint pattern, e.g. `vehicle.*` or `walker.pedestrian.*`
    pub model: String,
    pub count: usize,
    /// Pose used when `random_location` is off
    pub spawn_point: Option<Transform>,
    pub hero: bool,
    pub autopilot: bool,
    pub random_location: bool,
    /// Pedestrian crossing factor; configured default when `None`
    pub cross_factor: Option<f64>,
}

impl BatchRequest {
    /// `count` actors of `model` at random locations
    pub fn new(model: impl Into<String>, count: usize) -> Self {
        Self {
            model: model.into(),
            count,
            spawn_point: None,
            hero: false,
            autopilot: false,
            random_location: true,
            cross_factor: None,
        }
    }

    pub fn at(mut self, spawn_point: Transform) -> Self {
        self.spawn_point = Some(spawn_point);
        self.random_location = false;
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

    pub fn cross_factor(mut self, factor: f64) -> Self {
        self.cross_factor = Some(factor);
        self
    }

    /// Pedestrian batches are recognised by the model pattern
    pub fn is_walker_model(&self) -> bool {
        self.model.contains("walker")
    }

    fn role(&self) -> &'static str {
        if self.hero {
            roles::HERO
        } else if self.is_walker_model() {
            roles::WALKER
        } else if self.autopilot {
            roles::AUTOPILOT
        } else {
            roles::SCENARIO
        }
    }
}

/// Result of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Materialized vehicles/walkers in request order
    pub actors: Vec<ActorHandle>,
    /// (walker, controller) pairs that were attached
    pub controllers: Vec<(ActorId, ActorId)>,
    /// Commands sent in the spawn batch
    pub submitted: usize,
    /// Spawn and controller commands the simulator rejected
    pub failed: usize,
}

enum Placement {
    At(Transform),
    Skip,
    Exhausted,
}

/// One-shot batch executor borrowing the pool's spawn state
pub struct BatchSpawner<'a, C> {
    pub(crate) world: &'a C,
    /// Channel for atomic batches
    pub(crate) client: &'a C,
    pub(crate) allocator: &'a mut SpawnPointAllocator,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) config: &'a SpawnConfig,
    pub(crate) barrier: &'a FrameBarrier,
}

impl<'a, C: SimulatorClient> BatchSpawner<'a, C> {
    /// Run `request`; `hero_location` is the hero's live position, if any
    #[instrument(
        name = "batch_spawner_run",
        skip(self, request),
        fields(model = %request.model, count = request.count)
    )]
    pub async fn run(
        mut self,
        request: &BatchRequest,
        hero_location: Option<Location>,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        let catalog = self.world.filter_blueprints(&request.model).await?;
        if catalog.is_empty() {
            warn!(model = %request.model, "no blueprint matches batch model");
            return Ok(outcome);
        }

        // ===== Phase 1: spawn batch =====
        let commands = self
            .build_commands(request, &catalog, hero_location)
            .await?;
        outcome.submitted = commands.len();

        let mut spawned = Vec::with_capacity(commands.len());
        if !commands.is_empty() {
            for response in self.client.apply_batch_sync(commands, false).await? {
                match response {
                    CommandResponse::Spawned(id) => spawned.push(id),
                    CommandResponse::Failed(e) => {
                        warn!(error = %e, "batch spawn item failed");
                        record_batch_failure("spawn");
                        outcome.failed += 1;
                    }
                    CommandResponse::Applied => {}
                }
            }
        }
        outcome.actors = self.world.get_actors(&spawned).await?;

        // ===== Phase 2: walker controllers =====
        outcome.controllers = self.attach_controllers(&outcome.actors, &mut outcome.failed).await?;

        // ===== Phase 3: single frame + barrier =====
        let frame = self.world.tick().await?;
        match self.barrier.wait(self.world, frame).await {
            Ok(waited) => record_barrier_wait(waited),
            Err(e) => {
                error!(error = %e, frame, "frame barrier failed, rolling back batch");
                self.rollback(&outcome).await;
                return Err(e);
            }
        }

        // ===== Phase 4: set walkers in motion =====
        let cross_factor = request.cross_factor.unwrap_or(self.config.cross_factor);
        self.world.set_pedestrians_cross_factor(cross_factor).await?;
        for &(walker, controller) in &outcome.controllers {
            self.start_walker(walker, controller).await;
        }

        info!(
            requested = request.count,
            submitted = outcome.submitted,
            materialized = outcome.actors.len(),
            controllers = outcome.controllers.len(),
            failed = outcome.failed,
            "batch spawn completed"
        );
        Ok(outcome)
    }

    async fn build_commands(
        &mut self,
        request: &BatchRequest,
        catalog: &[Blueprint],
        hero_location: Option<Location>,
    ) -> Result<Vec<BatchCommand>> {
        let walkers = request.is_walker_model();
        let role = request.role();
        let mut commands = Vec::with_capacity(request.count);

        for index in 0..request.count {
            let Some(mut blueprint) = catalog.choose(&mut *self.rng).cloned() else {
                break;
            };
            make_mortal(&mut blueprint);
            set_role(&mut blueprint, role);

            let transform = match self.place(request, hero_location).await? {
                Placement::At(transform) => transform,
                Placement::Skip => continue,
                Placement::Exhausted => {
                    debug!(index, "spawn points exhausted, omitting remaining requests");
                    break;
                }
            };

            if walkers {
                if !self.assign_walker_speed(&mut blueprint) {
                    record_batch_failure("walker_speed");
                    continue;
                }
                commands.push(BatchCommand::spawn(blueprint, transform));
            } else {
                commands.push(
                    BatchCommand::spawn(blueprint, transform)
                        .then(FollowUp::SetAutopilot(request.autopilot)),
                );
            }
        }

        Ok(commands)
    }

    async fn place(
        &mut self,
        request: &BatchRequest,
        hero_location: Option<Location>,
    ) -> Result<Placement> {
        if !request.random_location {
            return Ok(match request.spawn_point {
                Some(transform) => Placement::At(transform),
                None => {
                    debug!("no spawn point supplied, skipping request");
                    Placement::Skip
                }
            });
        }

        if request.is_walker_model() {
            return Ok(match self.world.random_navigation_location().await? {
                Some(location) => Placement::At(Transform::new(
                    location.lifted(self.config.walker_lift),
                    Rotation::default(),
                )),
                None => {
                    warn!("navigation mesh returned no location, skipping walker");
                    record_batch_failure("navigation");
                    Placement::Skip
                }
            });
        }

        let Some(candidate) = self.allocator.allocate_next() else {
            return Ok(Placement::Exhausted);
        };
        if let Some(hero) = hero_location {
            let distance = hero.distance(&candidate.location);
            if distance < self.config.hero_clearance {
                debug!(distance, "spawn point too close to hero, skipping request");
                return Ok(Placement::Skip);
            }
        }
        Ok(Placement::At(candidate))
    }

    /// Pick walking or running speed; `false` if the blueprint has none
    fn assign_walker_speed(&mut self, blueprint: &mut Blueprint) -> bool {
        let running = self.rng.random::<f64>() < self.config.running_probability;
        let index = if running { 2 } else { 1 };

        let Some(speed) = blueprint.recommended_value("speed", index).map(str::to_string) else {
            warn!(blueprint = %blueprint.id, "walker has no usable speed attribute, skipping");
            return false;
        };

        if blueprint.is_modifiable("speed") {
            if let Err(e) = blueprint.set_attribute("speed", speed.as_str()) {
                warn!(blueprint = %blueprint.id, error = %e, "failed to set walker speed");
            }
        } else {
            debug!(blueprint = %blueprint.id, %speed, "speed attribute is fixed");
        }
        true
    }

    async fn attach_controllers(
        &mut self,
        actors: &[ActorHandle],
        failed: &mut usize,
    ) -> Result<Vec<(ActorId, ActorId)>> {
        let walkers: Vec<ActorId> = actors
            .iter()
            .filter(|a| a.is_walker())
            .map(|a| a.id)
            .collect();
        if walkers.is_empty() {
            return Ok(Vec::new());
        }

        let Some(controller_bp) = self.world.find_blueprint(WALKER_CONTROLLER_BLUEPRINT).await? else {
            warn!(walkers = walkers.len(), "walker controller blueprint missing");
            return Ok(Vec::new());
        };

        let commands = walkers
            .iter()
            .map(|&walker| {
                BatchCommand::spawn_attached(controller_bp.clone(), Transform::default(), walker)
            })
            .collect();
        let responses = self.client.apply_batch_sync(commands, false).await?;

        let mut pairs = Vec::with_capacity(walkers.len());
        for (walker, response) in walkers.into_iter().zip(responses) {
            match response {
                CommandResponse::Spawned(controller) => pairs.push((walker, controller)),
                other => {
                    error!(
                        walker,
                        error = other.error().unwrap_or("no actor created"),
                        "walker controller attach failed"
                    );
                    record_batch_failure("controller");
                    *failed += 1;
                }
            }
        }
        Ok(pairs)
    }

    async fn start_walker(&mut self, walker: ActorId, controller: ActorId) {
        if let Err(e) = self.world.start_walker_controller(controller).await {
            warn!(walker, controller, error = %e, "failed to start walker controller");
            return;
        }

        match self.world.random_navigation_location().await {
            Ok(Some(destination)) => {
                if let Err(e) = self.world.walker_go_to(controller, &destination).await {
                    warn!(walker, controller, error = %e, "failed to send walker");
                }
            }
            Ok(None) => warn!(walker, "navigation mesh returned no destination"),
            Err(e) => warn!(walker, error = %e, "navigation query failed"),
        }

        let (min, max) = (self.config.walker_speed_min, self.config.walker_speed_max);
        let speed = if max > min {
            self.rng.random_range(min..=max)
        } else {
            min
        };
        if let Err(e) = self.world.set_walker_max_speed(controller, speed).await {
            warn!(walker, controller, error = %e, "failed to set walker max speed");
        }
    }

    /// Destroy everything the batch created (fire-and-forget)
    async fn rollback(&self, outcome: &BatchOutcome) {
        let commands: Vec<BatchCommand> = outcome
            .controllers
            .iter()
            .map(|&(_, controller)| controller)
            .chain(outcome.actors.iter().map(|a| a.id))
            .map(BatchCommand::DestroyActor)
            .collect();
        if commands.is_empty() {
            return;
        }

        warn!(actors = commands.len(), "performing batch rollback");
        if let Err(e) = self.client.apply_batch_sync(commands, false).await {
            error!(error = %e, "batch rollback failed");
        }
    }
}

/// Force `is_invincible` off where the blueprint has it
pub(crate) fn make_mortal(blueprint: &mut Blueprint) {
    if blueprint.has_attribute("is_invincible") {
        if let Err(e) = blueprint.set_attribute("is_invincible", "false") {
            debug!(blueprint = %blueprint.id, error = %e, "cannot make actor mortal");
        }
    }
}

pub(crate) fn set_role(blueprint: &mut Blueprint, role: &str) {
    if let Err(e) = blueprint.set_attribute(ROLE_NAME_ATTRIBUTE, role) {
        warn!(blueprint = %blueprint.id, role, error = %e, "failed to set role name");
    }
}
