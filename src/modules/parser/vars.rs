//! Command-line variable parsing

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use strata_core::{CliVars, Mapping, StrataError};

/// Variables as handed over by a caller: already structured, or still text
#[derive(Debug, Clone, PartialEq)]
pub enum CliVarsInput {
    Parsed(CliVars),
    Text(String),
}

impl From<CliVars> for CliVarsInput {
    fn from(vars: CliVars) -> Self {
        CliVarsInput::Parsed(vars)
    }
}

impl From<Mapping> for CliVarsInput {
    fn from(mapping: Mapping) -> Self {
        CliVarsInput::Parsed(CliVars::from(mapping))
    }
}

impl From<&str> for CliVarsInput {
    fn from(text: &str) -> Self {
        CliVarsInput::Text(text.to_string())
    }
}

impl From<String> for CliVarsInput {
    fn from(text: String) -> Self {
        CliVarsInput::Text(text)
    }
}

impl Default for CliVarsInput {
    fn default() -> Self {
        CliVarsInput::Parsed(CliVars::new())
    }
}

/// Turn variable input into a structured variable set
///
/// Text is read as a YAML mapping such as `{key: value, other: 2}`. Duplicate
/// keys resolve to the last value given; blank text is an empty set.
pub fn parse_cli_vars(input: impl Into<CliVarsInput>) -> Result<CliVars, StrataError> {
    match input.into() {
        CliVarsInput::Parsed(vars) => Ok(vars),
        CliVarsInput::Text(text) => parse_text(&text),
    }
}

fn parse_text(text: &str) -> Result<CliVars, StrataError> {
    if text.trim().is_empty() {
        return Ok(CliVars::new());
    }

    let LastWins(mapping) = serde_yaml::from_str(text).map_err(|e| {
        StrataError::Parse(format!(
            "variables must be a mapping like \"{{key: value}}\", got '{}': {}",
            text, e
        ))
    })?;
    Ok(CliVars::from(mapping))
}

/// A top-level mapping that keeps the last of any duplicated keys
struct LastWins(Mapping);

impl<'de> Deserialize<'de> for LastWins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(LastWinsVisitor)
    }
}

struct LastWinsVisitor;

impl<'de> Visitor<'de> for LastWinsVisitor {
    type Value = LastWins;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of variables")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LastWins, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((key, value)) = access.next_entry::<serde_yaml::Value, Value>()? {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "variable names must be scalars, got {:?}",
                        other
                    )))
                }
            };
            mapping.insert(key, value);
        }
        Ok(LastWins(mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flow_mapping() {
        let vars = parse_cli_vars("{a: 1, b: 'x'}").unwrap();
        assert_eq!(serde_json::to_value(&vars).unwrap(), json!({"a": 1, "b": "x"}));
    }

    #[test]
    fn test_parse_value_types() {
        let vars = parse_cli_vars("{flag: true, ratio: 0.5, nested: {k: [1, 2]}, empty: null}").unwrap();
        assert_eq!(vars.get("flag"), Some(&json!(true)));
        assert_eq!(vars.get("ratio"), Some(&json!(0.5)));
        assert_eq!(vars.get("nested"), Some(&json!({"k": [1, 2]})));
        assert_eq!(vars.get("empty"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let vars = parse_cli_vars("{a: 1, a: 2}").unwrap();
        assert_eq!(vars.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_non_mapping_is_parse_error() {
        let err = parse_cli_vars("not-a-mapping").unwrap_err();
        assert!(matches!(err, StrataError::Parse(_)));

        assert!(matches!(parse_cli_vars("[1, 2]"), Err(StrataError::Parse(_))));
        assert!(matches!(parse_cli_vars("{a: [1, 2"), Err(StrataError::Parse(_))));
    }

    #[test]
    fn test_blank_and_passthrough() {
        assert!(parse_cli_vars("  ").unwrap().is_empty());
        assert!(parse_cli_vars("{}").unwrap().is_empty());

        let vars = CliVars::new().with("a", 1);
        assert_eq!(parse_cli_vars(vars.clone()).unwrap(), vars);
    }
}
