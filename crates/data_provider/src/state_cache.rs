//! Tick-synchronised actor state cache
//!
//! One record per registered actor, refreshed once per simulation step.
//! Queries are served from the cache and never reach the simulator.

use std::collections::HashMap;

use contracts::{ActorHandle, ActorId, Location, Transform};
use tracing::{debug, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};

/// Last values observed for one actor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachedState {
    /// Planar speed (m/s), 0.0 until the first refresh
    pub velocity: f64,
    pub location: Option<Location>,
    pub transform: Option<Transform>,
}

/// Actor state cache
#[derive(Debug, Default)]
pub struct StateCache {
    entries: HashMap<ActorId, CachedState>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty record for `actor`
    pub fn register(&mut self, actor: &ActorHandle) -> Result<()> {
        if self.entries.contains_key(&actor.id) {
            return Err(ProviderError::DuplicateRegistration {
                actor_id: actor.id,
                registry: "state cache",
            });
        }
        self.entries.insert(actor.id, CachedState::default());
        debug!(actor_id = actor.id, type_id = %actor.type_id, "actor registered");
        Ok(())
    }

    /// Register in order; the first duplicate aborts, earlier entries stay
    pub fn register_many<'a>(
        &mut self,
        actors: impl IntoIterator<Item = &'a ActorHandle>,
    ) -> Result<()> {
        for actor in actors {
            self.register(actor)?;
        }
        Ok(())
    }

    /// Refresh every live registered actor; returns how many were updated.
    ///
    /// Dead actors keep their last values.
    #[instrument(name = "state_cache_refresh", skip(self, client), fields(actors = self.entries.len()))]
    pub async fn refresh<C: SimulatorClient>(&mut self, client: &C) -> usize {
        let mut updated = 0;

        for (&actor_id, state) in self.entries.iter_mut() {
            match client.is_alive(actor_id).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(actor_id, error = %e, "aliveness query failed, keeping stale state");
                    continue;
                }
            }

            let velocity = client.actor_velocity(actor_id).await;
            let location = client.actor_location(actor_id).await;
            let transform = client.actor_transform(actor_id).await;

            match (velocity, location, transform) {
                (Ok(v), Ok(l), Ok(t)) => {
                    state.velocity = v.planar_length();
                    state.location = Some(l);
                    state.transform = Some(t);
                    updated += 1;
                }
                (v, l, t) => {
                    let error = [v.err(), l.err(), t.err()]
                        .into_iter()
                        .flatten()
                        .next()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    warn!(actor_id, %error, "state query failed, keeping stale state");
                }
            }
        }

        updated
    }

    /// Raw record; `None` when the actor was never registered
    pub fn cached_state(&self, actor_id: ActorId) -> Option<&CachedState> {
        self.entries.get(&actor_id)
    }

    pub fn velocity(&self, actor_id: ActorId) -> f64 {
        match self.entries.get(&actor_id) {
            Some(state) => state.velocity,
            None => {
                warn!(actor_id, "velocity requested for unregistered actor");
                0.0
            }
        }
    }

    pub fn location(&self, actor_id: ActorId) -> Option<Location> {
        match self.entries.get(&actor_id) {
            Some(state) => state.location,
            None => {
                warn!(actor_id, "location requested for unregistered actor");
                None
            }
        }
    }

    pub fn transform(&self, actor_id: ActorId) -> Option<Transform> {
        match self.entries.get(&actor_id) {
            Some(state) => state.transform,
            None => {
                warn!(actor_id, "transform requested for unregistered actor");
                None
            }
        }
    }

    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.entries.contains_key(&actor_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
