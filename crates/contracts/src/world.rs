//! World, map and batch-command types

use serde::{Deserialize, Serialize};

use crate::{ActorId, Blueprint, Transform};

/// Settings reported by the simulator world
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Lock-step mode: the client drives every tick
    pub synchronous_mode: bool,

    /// Fixed simulation step (seconds), if any
    pub fixed_delta_seconds: Option<f64>,
}

/// Static map description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapInfo {
    /// Map name (e.g., "Town01")
    pub name: String,

    /// Recommended spawn points
    pub spawn_points: Vec<Transform>,
}

/// Point on the lane graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub road_id: u32,
    pub lane_id: i32,

    /// Distance along the road (metres)
    pub s: f64,

    pub transform: Transform,

    /// Whether this point lies inside a junction
    pub is_intersection: bool,
}

/// Follow-up applied to the actor created by a spawn command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUp {
    SetAutopilot(bool),
}

/// One entry of an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    SpawnActor {
        blueprint: Blueprint,
        transform: Transform,
        /// Attach to this actor
        parent: Option<ActorId>,
        then: Option<FollowUp>,
    },
    DestroyActor(ActorId),
}

impl BatchCommand {
    pub fn spawn(blueprint: Blueprint, transform: Transform) -> Self {
        Self::SpawnActor {
            blueprint,
            transform,
            parent: None,
            then: None,
        }
    }

    pub fn spawn_attached(blueprint: Blueprint, transform: Transform, parent: ActorId) -> Self {
        Self::SpawnActor {
            blueprint,
            transform,
            parent: Some(parent),
            then: None,
        }
    }

    /// Chain a follow-up onto a spawn command; no-op for other commands
    pub fn then(self, follow_up: FollowUp) -> Self {
        match self {
            Self::SpawnActor {
                blueprint,
                transform,
                parent,
                ..
            } => Self::SpawnActor {
                blueprint,
                transform,
                parent,
                then: Some(follow_up),
            },
            other => other,
        }
    }
}

/// Per-command outcome of a batch, in command order
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Spawned(ActorId),
    Applied,
    Failed(String),
}

impl CommandResponse {
    pub fn actor_id(&self) -> Option<ActorId> {
        match self {
            Self::Spawned(id) => Some(*id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}
