//! Traffic-light registry
//!
//! Index of the map's traffic lights with the pose captured when the index
//! was built, plus the group-geometry and override/restore helpers.

use std::collections::HashMap;

use contracts::{
    ActorId, BoundingBox, GroupAnnotations, GroupBucket, LightStateOverrides, Location,
    ResetRecord, TrafficLightInfo, TrafficLightState, Transform, Waypoint,
};
use tracing::{debug, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};

/// Registered light
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLightEntry {
    pub id: ActorId,
    /// Pose snapshot taken at registry build
    pub transform: Transform,
    pub trigger_volume: Option<BoundingBox>,
}

impl TrafficLightEntry {
    /// Trigger-volume centre in world space
    pub fn trigger_location(&self) -> Option<Location> {
        self.trigger_volume
            .map(|tv| self.transform.transform_point(&tv.location))
    }
}

impl From<TrafficLightInfo> for TrafficLightEntry {
    fn from(info: TrafficLightInfo) -> Self {
        Self {
            id: info.id,
            transform: info.transform,
            trigger_volume: info.trigger_volume,
        }
    }
}

/// Lights in scan order with an id index
#[derive(Debug, Default)]
pub struct TrafficLightRegistry {
    entries: Vec<TrafficLightEntry>,
    index: HashMap<ActorId, usize>,
}

impl TrafficLightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one light; ids must be unique
    pub fn insert(&mut self, entry: TrafficLightEntry) -> Result<()> {
        if self.index.contains_key(&entry.id) {
            return Err(ProviderError::DuplicateRegistration {
                actor_id: entry.id,
                registry: "traffic light registry",
            });
        }
        self.index.insert(entry.id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Clear, then repopulate from a fresh scan of actors matching `filter`
    #[instrument(name = "traffic_lights_rebuild", skip(self, client))]
    pub async fn rebuild<C: SimulatorClient>(&mut self, client: &C, filter: &str) -> Result<usize> {
        self.clear();

        for actor in client.filter_actors(filter).await? {
            match client.traffic_light_info(actor.id).await? {
                Some(info) => self.insert(info.into())?,
                None => warn!(actor_id = actor.id, type_id = %actor.type_id, "matched actor is not a traffic light, skipping"),
            }
        }

        debug!(lights = self.entries.len(), "traffic light registry rebuilt");
        Ok(self.entries.len())
    }

    pub fn get(&self, light_id: ActorId) -> Option<&TrafficLightEntry> {
        self.index.get(&light_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, light_id: ActorId) -> bool {
        self.index.contains_key(&light_id)
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TrafficLightEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Light whose world-space trigger centre is closest to `location`.
    ///
    /// Lights without a trigger volume are ignored; ties keep the earlier entry.
    pub fn nearest_to(&self, location: &Location) -> Option<&TrafficLightEntry> {
        let mut best: Option<(&TrafficLightEntry, f64)> = None;
        for entry in &self.entries {
            let Some(trigger) = entry.trigger_location() else {
                continue;
            };
            let distance = trigger.distance(location);
            match best {
                Some((_, closest)) if distance >= closest => {}
                _ => best = Some((entry, distance)),
            }
        }
        best.map(|(entry, _)| entry)
    }
}

/// Bucket of `target_yaw` relative to `reference_yaw` (degrees)
pub fn classify_heading(reference_yaw: f64, target_yaw: f64) -> GroupBucket {
    let diff = (target_yaw - reference_yaw).rem_euclid(360.0);
    if diff <= 45.0 || diff > 340.0 {
        GroupBucket::Ref
    } else if diff > 240.0 && diff < 300.0 {
        GroupBucket::Left
    } else if diff > 160.0 && diff <= 240.0 {
        GroupBucket::Opposite
    } else {
        GroupBucket::Right
    }
}

/// Bucket every light of `group` against `reference`
pub fn annotate_lights(reference: &TrafficLightInfo, group: &[TrafficLightInfo]) -> GroupAnnotations {
    let reference_yaw = reference.transform.rotation.yaw;
    let mut annotations = GroupAnnotations::default();
    for light in group {
        annotations.push(
            classify_heading(reference_yaw, light.transform.rotation.yaw),
            light.id,
        );
    }
    annotations
}

/// Walk forward from `start` and return the last waypoint before a junction.
///
/// `None` when `start` is off-road or already inside a junction.
pub async fn last_waypoint_before_junction<C: SimulatorClient>(
    client: &C,
    start: &Location,
    step: f64,
    max_steps: usize,
) -> Result<Option<Waypoint>> {
    let Some(mut waypoint) = client.waypoint_at(start).await? else {
        return Ok(None);
    };

    let mut last = None;
    for _ in 0..max_steps {
        if waypoint.is_intersection {
            break;
        }
        last = Some(waypoint);
        match client.next_waypoints(&waypoint, step).await?.first() {
            Some(next) => waypoint = *next,
            None => break,
        }
    }
    Ok(last)
}

/// Apply `overrides` (ego first, then ref, left, right, opposite).
///
/// Each light's timing is recorded once, before it is first touched. A light
/// named by more than one slot ends in the state of the last slot. With
/// `freeze` all three phase durations are pinned to `timeout`.
#[instrument(name = "traffic_lights_update", skip(client, annotations, overrides))]
pub async fn update_light_states<C: SimulatorClient>(
    client: &C,
    ego_light: Option<ActorId>,
    annotations: &GroupAnnotations,
    overrides: &LightStateOverrides,
    freeze: bool,
    timeout: f64,
) -> Result<Vec<ResetRecord>> {
    let mut targets: Vec<(ActorId, TrafficLightState)> = Vec::new();
    if let (Some(ego), Some(state)) = (ego_light, overrides.ego) {
        targets.push((ego, state));
    }
    for bucket in LightStateOverrides::GROUP_ORDER {
        if let Some(state) = overrides.for_bucket(bucket) {
            for &light in annotations.bucket(bucket) {
                targets.push((light, state));
            }
        }
    }

    let mut records: Vec<ResetRecord> = Vec::with_capacity(targets.len());
    for (light, state) in targets {
        if records.iter().any(|r| r.light == light) {
            debug!(light, ?state, "light overridden again by a later slot");
        } else {
            let saved = client.light_timing(light).await?;
            records.push(ResetRecord { light, saved });
        }

        client.set_light_state(light, state).await?;
        if freeze {
            client.set_light_times(light, timeout, timeout, timeout).await?;
        }
        debug!(light, ?state, freeze, "traffic light overridden");
    }
    Ok(records)
}

/// Replay saved timings in order
#[instrument(name = "traffic_lights_reset", skip(client, records), fields(records = records.len()))]
pub async fn reset_lights<C: SimulatorClient>(client: &C, records: &[ResetRecord]) -> Result<()> {
    for record in records {
        let saved = &record.saved;
        client.set_light_state(record.light, saved.state).await?;
        client
            .set_light_times(record.light, saved.green_time, saved.red_time, saved.yellow_time)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockSimulator, MockTrafficLight};
    use contracts::Rotation;

    fn light_at(x: f64, y: f64, yaw: f64, group: u32) -> MockTrafficLight {
        MockTrafficLight::new(
            Transform::new(Location::new(x, y, 0.0), Rotation::from_yaw(yaw)),
            group,
        )
    }

    fn info(id: ActorId, yaw: f64) -> TrafficLightInfo {
        TrafficLightInfo {
            id,
            transform: Transform::new(Location::default(), Rotation::from_yaw(yaw)),
            trigger_volume: None,
        }
    }

    #[test]
    fn test_classify_heading_boundaries() {
        assert_eq!(classify_heading(0.0, 0.0), GroupBucket::Ref);
        assert_eq!(classify_heading(0.0, 45.0), GroupBucket::Ref);
        assert_eq!(classify_heading(0.0, 46.0), GroupBucket::Right);
        assert_eq!(classify_heading(0.0, 90.0), GroupBucket::Right);
        assert_eq!(classify_heading(0.0, 160.0), GroupBucket::Right);
        assert_eq!(classify_heading(0.0, 180.0), GroupBucket::Opposite);
        assert_eq!(classify_heading(0.0, 240.0), GroupBucket::Opposite);
        assert_eq!(classify_heading(0.0, 270.0), GroupBucket::Left);
        assert_eq!(classify_heading(0.0, 300.0), GroupBucket::Right);
        assert_eq!(classify_heading(0.0, 340.0), GroupBucket::Right);
        assert_eq!(classify_heading(0.0, 341.0), GroupBucket::Ref);
        // negative differences wrap
        assert_eq!(classify_heading(90.0, 0.0), GroupBucket::Left);
    }

    #[test]
    fn test_annotation_rotation_invariant() {
        let group = [info(1, 10.0), info(2, 100.0), info(3, 190.0), info(4, 280.0)];
        let base = annotate_lights(&group[0], &group);
        assert_eq!(base.reference, vec![1]);
        assert_eq!(base.right, vec![2]);
        assert_eq!(base.opposite, vec![3]);
        assert_eq!(base.left, vec![4]);

        for shift in [37.0, 180.0, -415.0] {
            let shifted: Vec<_> = group
                .iter()
                .map(|l| info(l.id, l.transform.rotation.yaw + shift))
                .collect();
            assert_eq!(annotate_lights(&shifted[0], &shifted), base);
        }
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let mut registry = TrafficLightRegistry::new();
        let volume = Some(BoundingBox {
            location: Location::default(),
            extent: Default::default(),
        });
        for (id, x) in [(1, -5.0), (2, 5.0), (3, 20.0)] {
            registry
                .insert(TrafficLightEntry {
                    id,
                    transform: Transform::new(Location::new(x, 0.0, 0.0), Rotation::default()),
                    trigger_volume: volume,
                })
                .unwrap();
        }
        registry
            .insert(TrafficLightEntry {
                id: 4,
                transform: Transform::default(),
                trigger_volume: None,
            })
            .unwrap();

        assert_eq!(registry.nearest_to(&Location::default()).unwrap().id, 1);
        assert_eq!(registry.nearest_to(&Location::new(18.0, 0.0, 0.0)).unwrap().id, 3);
        let duplicate = registry.get(1).unwrap().clone();
        assert!(registry.insert(duplicate).is_err());
    }

    #[tokio::test]
    async fn test_rebuild_reflects_fresh_scan() {
        let sim = MockSimulator::new();
        let a = sim.add_traffic_light(light_at(0.0, 0.0, 0.0, 1));
        let b = sim.add_traffic_light(light_at(10.0, 0.0, 90.0, 1));

        let mut registry = TrafficLightRegistry::new();
        assert_eq!(registry.rebuild(&sim, "*traffic_light*").await.unwrap(), 2);
        assert!(registry.contains(a) && registry.contains(b));

        sim.kill(a);
        assert_eq!(registry.rebuild(&sim, "*traffic_light*").await.unwrap(), 1);
        assert!(!registry.contains(a));
    }

    #[tokio::test]
    async fn test_update_then_reset_restores_timing() {
        let sim = MockSimulator::new();
        let ego = sim.add_traffic_light(light_at(0.0, 0.0, 0.0, 1));
        let right = sim.add_traffic_light(light_at(10.0, 0.0, 90.0, 1));
        let opposite = sim.add_traffic_light(light_at(10.0, 10.0, 180.0, 1));
        let before: Vec<_> = [ego, right, opposite]
            .iter()
            .map(|&id| sim.timing_of(id).unwrap())
            .collect();

        let group = sim.group_traffic_lights(ego).await.unwrap();
        let reference = group.iter().find(|l| l.id == ego).unwrap().clone();
        let annotations = annotate_lights(&reference, &group);

        let overrides = LightStateOverrides {
            ego: Some(TrafficLightState::Green),
            reference: Some(TrafficLightState::Off),
            right: Some(TrafficLightState::Red),
            opposite: Some(TrafficLightState::Yellow),
            ..Default::default()
        };
        let records = update_light_states(&sim, Some(ego), &annotations, &overrides, true, 1e9)
            .await
            .unwrap();

        let order: Vec<_> = records.iter().map(|r| r.light).collect();
        assert_eq!(order, vec![ego, right, opposite]);
        // the ego light sits in its own ref bucket, so the ref slot lands last
        let frozen = sim.timing_of(ego).unwrap();
        assert_eq!(frozen.state, TrafficLightState::Off);
        assert_eq!(frozen.green_time, 1e9);
        assert_eq!(frozen.yellow_time, 1e9);

        reset_lights(&sim, &records).await.unwrap();
        reset_lights(&sim, &records).await.unwrap();
        let after: Vec<_> = [ego, right, opposite]
            .iter()
            .map(|&id| sim.timing_of(id).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_later_slot_overwrites_ego_state() {
        let sim = MockSimulator::new();
        let ego = sim.add_traffic_light(light_at(0.0, 0.0, 0.0, 7));
        let before = sim.timing_of(ego).unwrap();

        let group = sim.group_traffic_lights(ego).await.unwrap();
        let annotations = annotate_lights(&group[0], &group);
        assert_eq!(annotations.reference, vec![ego]);

        let overrides = LightStateOverrides {
            ego: Some(TrafficLightState::Green),
            reference: Some(TrafficLightState::Red),
            ..Default::default()
        };
        let records = update_light_states(&sim, Some(ego), &annotations, &overrides, false, 0.0)
            .await
            .unwrap();

        assert_eq!(sim.timing_of(ego).unwrap().state, TrafficLightState::Red);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].saved, before);

        reset_lights(&sim, &records).await.unwrap();
        assert_eq!(sim.timing_of(ego).unwrap(), before);
    }
}
