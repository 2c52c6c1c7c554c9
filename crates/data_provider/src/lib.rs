//! # Data Provider
//!
//! State-caching and actor-lifecycle layer over a driving simulator.
//!
//! Responsibilities:
//! - Cache velocity / location / transform of registered actors once per tick
//! - Index traffic lights, bucket intersection groups, override and restore phases
//! - Spawn single actors and barrier-synchronised batches, track and destroy them
//! - Provide the `SimulatorClient` abstraction and an in-process `MockSimulator`
//!
//! Everything is owned by explicit context objects (`CarlaDataProvider`,
//! `CarlaActorPool`, bundled by `ScenarioContext`) driven from a single task.

pub mod actor_pool;
pub mod barrier;
pub mod batch;
pub mod client;
pub mod context;
pub mod error;
pub mod mock_client;
pub mod provider;
pub mod spawn_points;
pub mod state_cache;
pub mod traffic_lights;

pub use actor_pool::{ActorRequest, CarlaActorPool};
pub use barrier::FrameBarrier;
pub use batch::{BatchOutcome, BatchRequest};
pub use client::SimulatorClient;
pub use context::ScenarioContext;
pub use error::{ProviderError, Result};
pub use mock_client::{MockConfig, MockLane, MockSimulator, MockTrafficLight};
pub use provider::CarlaDataProvider;
pub use spawn_points::SpawnPointAllocator;
pub use state_cache::{CachedState, StateCache};
pub use traffic_lights::{
    annotate_lights, classify_heading, reset_lights, update_light_states, TrafficLightEntry,
    TrafficLightRegistry,
};
