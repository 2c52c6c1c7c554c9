//! Blueprint catalog entries
//!
//! A blueprint is a value: callers take a copy from the catalog, adjust its
//! modifiable attributes, and hand it to a spawn request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BlueprintId, ContractError};

/// Single blueprint attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintAttribute {
    /// Current value
    pub value: String,

    /// Values suggested by the simulator (e.g. walker speeds)
    #[serde(default)]
    pub recommended_values: Vec<String>,

    /// Whether `set_attribute` may change the value
    #[serde(default)]
    pub modifiable: bool,
}

impl BlueprintAttribute {
    /// Modifiable attribute with an initial value
    pub fn modifiable(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            recommended_values: Vec::new(),
            modifiable: true,
        }
    }

    /// Read-only attribute
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            recommended_values: Vec::new(),
            modifiable: false,
        }
    }

    pub fn with_recommended(mut self, values: &[&str]) -> Self {
        self.recommended_values = values.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// Actor blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Blueprint name, e.g. `"vehicle.tesla.model3"`
    pub id: BlueprintId,

    #[serde(default)]
    pub attributes: BTreeMap<String, BlueprintAttribute>,
}

impl Blueprint {
    pub fn new(id: impl Into<BlueprintId>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, attribute: BlueprintAttribute) -> Self {
        self.attributes.insert(key.into(), attribute);
        self
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&BlueprintAttribute> {
        self.attributes.get(key)
    }

    /// Capability check performed before `set_attribute`
    pub fn is_modifiable(&self, key: &str) -> bool {
        self.attributes.get(key).is_some_and(|a| a.modifiable)
    }

    /// Set an attribute value
    ///
    /// # Errors
    /// Missing attribute or read-only attribute.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) -> Result<(), ContractError> {
        let attribute = self
            .attributes
            .get_mut(key)
            .ok_or_else(|| ContractError::attribute_not_found(self.id.as_str(), key))?;

        if !attribute.modifiable {
            return Err(ContractError::AttributeNotModifiable {
                blueprint: self.id.to_string(),
                attribute: key.to_string(),
            });
        }

        attribute.value = value.into();
        Ok(())
    }

    /// Recommended value at `index` for `key`
    pub fn recommended_value(&self, key: &str, index: usize) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|a| a.recommended_values.get(index))
            .map(String::as_str)
    }

    /// Flatten attribute values (as stored on a spawned actor)
    pub fn attribute_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, a)| (k.as_str(), a.value.as_str()))
    }
}

/// Vehicle category used to pick a fallback blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    #[default]
    Car,
    Van,
    Truck,
    Trailer,
    Semitrailer,
    Bus,
    Motorbike,
    Bicycle,
    Train,
    Tram,
}

impl VehicleCategory {
    /// Built-in fallback blueprint; `None` when the category has no model
    pub fn default_blueprint(&self) -> Option<&'static str> {
        match self {
            Self::Car => Some("vehicle.tesla.model3"),
            Self::Van | Self::Bus => Some("vehicle.volkswagen.t2"),
            Self::Truck => Some("vehicle.carlamotors.carlacola"),
            Self::Motorbike => Some("vehicle.kawasaki.ninja"),
            Self::Bicycle => Some("vehicle.diamondback.century"),
            Self::Trailer | Self::Semitrailer | Self::Train | Self::Tram => None,
        }
    }
}
