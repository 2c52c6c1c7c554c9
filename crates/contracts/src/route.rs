//! Ego route

use serde::{Deserialize, Serialize};

use crate::{ActorId, Transform};

/// High-level manoeuvre attached to a route waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadOption {
    #[default]
    Void,
    Left,
    Right,
    Straight,
    LaneFollow,
    ChangeLaneLeft,
    ChangeLaneRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteWaypoint {
    pub transform: Transform,
    #[serde(default)]
    pub option: RoadOption,
}

/// Ordered waypoints bound to one ego actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub ego: ActorId,
    pub waypoints: Vec<RouteWaypoint>,
}

impl Route {
    pub fn new(ego: ActorId, waypoints: Vec<RouteWaypoint>) -> Self {
        Self { ego, waypoints }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Final waypoint of the route
    pub fn destination(&self) -> Option<&RouteWaypoint> {
        self.waypoints.last()
    }
}
