//! Mapping round-trip contract for configuration entities
//!
//! Every entity converts losslessly to a JSON-compatible mapping and back.
//! The inverse direction also normalizes the input (aliases, default-filled
//! fields) and checks it against the entity's shape before deserializing, so
//! a bad mapping is rejected with the path of the offending field.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use strata_types::shape::describe;
use strata_types::{Keypath, Shape};

use crate::error::{Result, StrataError};

/// String-keyed mapping of JSON-compatible values
pub type Mapping = serde_json::Map<String, Value>;

/// Bidirectional mapping conversion with schema validation
pub trait Contract: Serialize + DeserializeOwned + PartialEq + Sized {
    /// Shape the canonical mapping must have
    fn shape() -> Shape;

    /// Normalize a mapping in place before it is checked
    fn canonicalize(_mapping: &mut Mapping) {}

    /// Entity-level invariants that a shape cannot express
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Check an entity built in code against the rules [`Contract::from_mapping`]
    /// applies to mappings
    fn verify(&self) -> Result<()> {
        let mut mapping = self.to_mapping()?;
        Self::canonicalize(&mut mapping);
        Self::shape().check(&Value::Object(mapping), &Keypath::root())?;
        self.validate()
    }

    /// Structural mapping representation of this entity
    fn to_mapping(&self) -> Result<Mapping> {
        into_mapping(serde_json::to_value(self)?)
    }

    /// Build and validate an entity from its mapping representation
    fn from_mapping(mapping: &Mapping) -> Result<Self> {
        let mut canonical = mapping.clone();
        Self::canonicalize(&mut canonical);

        let value = Value::Object(canonical);
        Self::shape().check(&value, &Keypath::root())?;

        let entity: Self = serde_json::from_value(value).map_err(|e| {
            StrataError::validation(Keypath::root(), Self::shape().to_string(), e.to_string())
        })?;
        entity.validate()?;
        Ok(entity)
    }
}

/// Unwrap a value that must be a mapping
pub fn into_mapping(value: Value) -> Result<Mapping> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StrataError::validation(
            Keypath::root(),
            "mapping",
            describe(&other),
        )),
    }
}

/// Apply `canonicalize` to the nested mapping stored under `key`, if any
pub(crate) fn canonicalize_child<C: Contract>(mapping: &mut Mapping, key: &str) {
    if let Some(Value::Object(child)) = mapping.get_mut(key) {
        C::canonicalize(child);
    }
}
