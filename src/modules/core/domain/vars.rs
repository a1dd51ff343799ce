//! Command-line variable overrides

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::Mapping;

/// Variables supplied on the command line, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CliVars(Mapping);

impl CliVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a variable, replacing any earlier value for the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }
}

impl From<Mapping> for CliVars {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

impl FromIterator<(String, Value)> for CliVars {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_write_wins() {
        let vars = CliVars::new().with("a", 1).with("a", 2);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let vars = CliVars::new().with("name", "x");
        assert_eq!(serde_json::to_value(&vars).unwrap(), json!({"name": "x"}));
    }
}
