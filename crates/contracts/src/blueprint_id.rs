//! BlueprintId - Cheap-to-clone blueprint / actor type identifier
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Blueprint identifier with cheap cloning, e.g. `"vehicle.tesla.model3"`.
///
/// The same identifier doubles as the `type_id` of every actor spawned from
/// the blueprint, so it is cloned into each handle.
///
/// # Examples
/// ```
/// use contracts::BlueprintId;
///
/// let id: BlueprintId = "walker.pedestrian.0001".into();
/// assert!(id.is_walker());
/// assert_eq!(id.as_str(), "walker.pedestrian.0001");
/// ```
#[derive(Clone, Default)]
pub struct BlueprintId(Arc<str>);

impl BlueprintId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `vehicle.*`
    pub fn is_vehicle(&self) -> bool {
        self.0.starts_with("vehicle.")
    }

    /// `walker.*` (pedestrians, not their controllers)
    pub fn is_walker(&self) -> bool {
        self.0.starts_with("walker.")
    }

    /// `controller.*`
    pub fn is_controller(&self) -> bool {
        self.0.starts_with("controller.")
    }

    pub fn is_traffic_light(&self) -> bool {
        self.0.contains("traffic_light")
    }
}

impl Deref for BlueprintId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for BlueprintId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlueprintId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlueprintId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for BlueprintId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlueprintId({:?})", self.0)
    }
}

impl PartialEq for BlueprintId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for BlueprintId {}

impl PartialEq<str> for BlueprintId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for BlueprintId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Same hash as str so maps can be queried with &str
impl Hash for BlueprintId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for BlueprintId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlueprintId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_is_cheap() {
        let id1: BlueprintId = "vehicle.tesla.model3".into();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(BlueprintId::from("vehicle.audi.tt").is_vehicle());
        assert!(BlueprintId::from("walker.pedestrian.0002").is_walker());
        assert!(BlueprintId::from("controller.ai.walker").is_controller());
        assert!(BlueprintId::from("traffic.traffic_light").is_traffic_light());
        assert!(!BlueprintId::from("controller.ai.walker").is_walker());
    }

    #[test]
    fn test_hashmap_key() {
        let mut map: HashMap<BlueprintId, i32> = HashMap::new();
        map.insert("vehicle.a".into(), 1);
        assert_eq!(map.get("vehicle.a"), Some(&1));
    }

    #[test]
    fn test_serde() {
        let id: BlueprintId = "vehicle.a".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"vehicle.a\"");
        let parsed: BlueprintId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
