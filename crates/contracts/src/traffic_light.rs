//! Traffic-light types
//!
//! Static description, mutable timing, group buckets and override requests.

use serde::{Deserialize, Serialize};

use crate::{ActorId, BoundingBox, Transform};

/// Light phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
    Off,
    #[default]
    Unknown,
}

/// Current phase plus the duration of each phase (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightTiming {
    pub state: TrafficLightState,
    pub green_time: f64,
    pub red_time: f64,
    pub yellow_time: f64,
}

/// Static description of a traffic light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightInfo {
    pub id: ActorId,

    /// World pose of the light
    pub transform: Transform,

    /// Region in which approaching actors obey this light (local frame)
    pub trigger_volume: Option<BoundingBox>,
}

/// Position of a light relative to a reference light of the same group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBucket {
    Ref,
    Left,
    Right,
    Opposite,
}

/// Lights of one intersection group, bucketed by relative heading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAnnotations {
    pub reference: Vec<ActorId>,
    pub left: Vec<ActorId>,
    pub right: Vec<ActorId>,
    pub opposite: Vec<ActorId>,
}

impl GroupAnnotations {
    pub fn bucket(&self, bucket: GroupBucket) -> &[ActorId] {
        match bucket {
            GroupBucket::Ref => &self.reference,
            GroupBucket::Left => &self.left,
            GroupBucket::Right => &self.right,
            GroupBucket::Opposite => &self.opposite,
        }
    }

    pub fn push(&mut self, bucket: GroupBucket, id: ActorId) {
        match bucket {
            GroupBucket::Ref => self.reference.push(id),
            GroupBucket::Left => self.left.push(id),
            GroupBucket::Right => self.right.push(id),
            GroupBucket::Opposite => self.opposite.push(id),
        }
    }

    pub fn len(&self) -> usize {
        self.reference.len() + self.left.len() + self.right.len() + self.opposite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Requested phases for an override; `None` leaves that slot untouched.
///
/// Slots are applied in the order ego, ref, left, right, opposite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightStateOverrides {
    pub ego: Option<TrafficLightState>,
    pub reference: Option<TrafficLightState>,
    pub left: Option<TrafficLightState>,
    pub right: Option<TrafficLightState>,
    pub opposite: Option<TrafficLightState>,
}

impl LightStateOverrides {
    /// Group buckets in application order
    pub const GROUP_ORDER: [GroupBucket; 4] = [
        GroupBucket::Ref,
        GroupBucket::Left,
        GroupBucket::Right,
        GroupBucket::Opposite,
    ];

    pub fn for_bucket(&self, bucket: GroupBucket) -> Option<TrafficLightState> {
        match bucket {
            GroupBucket::Ref => self.reference,
            GroupBucket::Left => self.left,
            GroupBucket::Right => self.right,
            GroupBucket::Opposite => self.opposite,
        }
    }
}

/// State captured before an override, replayed by a reset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResetRecord {
    pub light: ActorId,
    pub saved: LightTiming,
}
