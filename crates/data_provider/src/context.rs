//! Scenario context
//!
//! Bundles the data provider and the actor pool that share one world
//! binding. Tests create as many independent contexts as they need.

use std::sync::Arc;

use contracts::{ActorHandle, ProviderConfig};
use tracing::info;

use crate::actor_pool::{ActorRequest, CarlaActorPool};
use crate::batch::BatchRequest;
use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};
use crate::provider::CarlaDataProvider;

pub struct ScenarioContext<C> {
    pub provider: CarlaDataProvider<C>,
    pub pool: CarlaActorPool<C>,
}

impl<C: SimulatorClient> ScenarioContext<C> {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            provider: CarlaDataProvider::new(config.traffic_lights.clone()),
            pool: CarlaActorPool::new(config.spawn.clone(), &config.barrier),
        }
    }

    /// Bind both halves to the same world
    pub async fn bind(&mut self, world: Arc<C>) -> Result<()> {
        self.provider.set_world(Arc::clone(&world)).await?;
        self.pool.set_client(Arc::clone(&world));
        self.pool.set_world(world).await?;
        info!(
            spawn_points = self.pool.spawn_points().len(),
            "scenario context bound"
        );
        Ok(())
    }

    /// Spawn one actor, pool it and start caching its state
    pub async fn spawn_tracked(&mut self, request: ActorRequest) -> Result<Option<ActorHandle>> {
        let Some(actor) = self.pool.request_new_actor(request).await else {
            return Ok(None);
        };
        self.provider.register_actor(&actor)?;
        Ok(Some(actor))
    }

    /// Spawn a batch, pool it and start caching every actor.
    ///
    /// Actors are pooled before they are registered. If one of them is
    /// already in the cache the error is returned, every batch actor stays
    /// in the pool and the ones ahead of the duplicate stay cached.
    /// `cleanup` still destroys all of them.
    pub async fn spawn_batch_tracked(&mut self, request: BatchRequest) -> Result<Vec<ActorHandle>> {
        let actors = self.pool.request_new_batch_actors(request).await;
        self.provider.register_actors(&actors)?;
        Ok(actors)
    }

    /// Advance the world one step and refresh the cache; returns the frame
    pub async fn step(&mut self) -> Result<u64> {
        let world = self
            .provider
            .get_world()
            .cloned()
            .ok_or(ProviderError::UnboundWorld { operation: "step" })?;
        let frame = if self.provider.is_sync_mode() {
            world.tick().await?
        } else {
            world.wait_for_tick().await?
        };
        self.provider.on_tick().await?;
        Ok(frame)
    }

    /// Destroy pooled actors, then drop all cached state
    pub async fn cleanup(&mut self) {
        self.pool.cleanup().await;
        self.provider.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockConfig, MockSimulator};
    use contracts::{Location, Rotation, Transform, Vector3D};

    #[tokio::test]
    async fn test_contexts_are_independent() {
        let config = ProviderConfig::default();
        let sim_a = Arc::new(MockSimulator::with_config(
            MockConfig::default().with_spawn_row(3, 20.0),
        ));
        let sim_b = Arc::new(MockSimulator::new());

        let mut a = ScenarioContext::new(&config);
        let mut b = ScenarioContext::new(&config);
        a.bind(Arc::clone(&sim_a)).await.unwrap();
        b.bind(Arc::clone(&sim_b)).await.unwrap();

        let actors = a.spawn_batch_tracked(BatchRequest::new("vehicle.*", 2)).await.unwrap();
        assert_eq!(actors.len(), 2);
        assert_eq!(a.pool.len(), 2);
        assert!(b.pool.is_empty());
        assert_eq!(sim_b.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_duplicate_keeps_actors_pooled() {
        let sim = Arc::new(MockSimulator::with_config(
            MockConfig::default().with_spawn_row(3, 20.0),
        ));
        let mut ctx = ScenarioContext::new(&ProviderConfig::default());
        ctx.bind(Arc::clone(&sim)).await.unwrap();

        // the batch allocates the next two ids in order
        let base = sim.next_id();
        let (first, second) = (base + 1, base + 2);
        ctx.provider
            .register_actor(&ActorHandle::new(second, "vehicle.audi.tt"))
            .unwrap();

        let err = ctx
            .spawn_batch_tracked(BatchRequest::new("vehicle.*", 2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::DuplicateRegistration { actor_id, .. } if actor_id == second
        ));
        assert!(ctx.pool.actor_id_exists(first));
        assert!(ctx.pool.actor_id_exists(second));
        assert!(ctx.provider.cached_state(first).is_some());

        ctx.cleanup().await;
        assert_eq!(sim.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_step_refreshes_tracked_actor() {
        let sim = Arc::new(MockSimulator::new());
        let mut ctx = ScenarioContext::new(&ProviderConfig::default());
        ctx.bind(Arc::clone(&sim)).await.unwrap();

        let actor = ctx
            .spawn_tracked(ActorRequest::new(
                "vehicle.tesla.model3",
                Transform::new(Location::new(0.0, 0.0, 0.0), Rotation::default()),
            ))
            .await
            .unwrap()
            .unwrap();
        sim.set_velocity(actor.id, Vector3D::new(10.0, 0.0, 0.0));

        ctx.step().await.unwrap();
        assert!((ctx.provider.get_velocity(actor.id) - 10.0).abs() < 1e-9);
        // one step at 0.05 s moves the car 0.5 m
        let x = ctx.provider.get_location(actor.id).unwrap().x;
        assert!((x - 0.5).abs() < 1e-9);

        ctx.cleanup().await;
        assert_eq!(sim.actor_count(), 0);
        assert!(ctx.provider.get_world().is_none());
    }
}
