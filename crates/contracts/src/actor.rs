//! Actor handles
//!
//! Descriptors of simulator-owned entities. The provider never owns the
//! entity itself; aliveness and kinematics are queried by id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::BlueprintId;

/// Simulator actor handle type
pub type ActorId = u32;

/// Attribute carrying the actor's role
pub const ROLE_NAME_ATTRIBUTE: &str = "role_name";

/// Blueprint of the AI controller attached to walkers
pub const WALKER_CONTROLLER_BLUEPRINT: &str = "controller.ai.walker";

/// Well-known role names
pub mod roles {
    pub const HERO: &str = "hero";
    pub const WALKER: &str = "walker";
    pub const AUTOPILOT: &str = "autopilot";
    pub const SCENARIO: &str = "scenario";
}

/// Coarse actor classification derived from the type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Vehicle,
    Walker,
    Controller,
    TrafficLight,
    Other,
}

impl ActorKind {
    pub fn of(type_id: &BlueprintId) -> Self {
        if type_id.is_vehicle() {
            Self::Vehicle
        } else if type_id.is_walker() {
            Self::Walker
        } else if type_id.is_controller() {
            Self::Controller
        } else if type_id.is_traffic_light() {
            Self::TrafficLight
        } else {
            Self::Other
        }
    }

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Walker => "walker",
            Self::Controller => "controller",
            Self::TrafficLight => "traffic_light",
            Self::Other => "other",
        }
    }
}

/// Handle to a live simulator actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorHandle {
    /// Stable identity assigned by the simulator
    pub id: ActorId,

    /// Blueprint the actor was spawned from
    pub type_id: BlueprintId,

    /// Attribute values fixed at spawn time
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ActorHandle {
    pub fn new(id: ActorId, type_id: impl Into<BlueprintId>) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn role_name(&self) -> Option<&str> {
        self.attribute(ROLE_NAME_ATTRIBUTE)
    }

    pub fn is_hero(&self) -> bool {
        self.role_name() == Some(roles::HERO)
    }

    pub fn kind(&self) -> ActorKind {
        ActorKind::of(&self.type_id)
    }

    pub fn is_vehicle(&self) -> bool {
        self.type_id.is_vehicle()
    }

    pub fn is_walker(&self) -> bool {
        self.type_id.is_walker()
    }
}
