//! Warehouse connection credentials

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use strata_types::{Connector, Shape};

use crate::contract::{Contract, Mapping};

/// Placeholder written in place of secret values
pub const MASK: &str = "********";

/// Connection credentials for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Connector type (`type` in mappings)
    #[serde(rename = "type")]
    pub connector: Connector,

    /// Database (or project) that models are built in
    pub database: String,

    /// Schema (or dataset) that models are built in
    pub schema: String,

    /// Connector-specific fields (host, user, port, ...)
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Credentials {
    /// Create credentials with no connector-specific fields
    pub fn new(connector: Connector, database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            connector,
            database: database.into(),
            schema: schema.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a connector-specific field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns true if the field holds a secret for this connector
    pub fn is_secret(&self, name: &str) -> bool {
        self.connector.secret_fields().contains(&name)
    }

    /// Non-secret connection parameters, safe to expose to templates
    pub fn connection_info(&self) -> Mapping {
        let mut info = Mapping::new();
        info.insert("type".to_string(), Value::from(self.connector.type_key()));
        info.insert("database".to_string(), Value::from(self.database.clone()));
        info.insert("schema".to_string(), Value::from(self.schema.clone()));
        for (name, value) in &self.fields {
            if !self.is_secret(name) {
                info.insert(name.clone(), value.clone());
            }
        }
        info
    }

    /// Mapping representation with secret values replaced by a mask
    pub fn masked(&self) -> Mapping {
        let mut masked = self.connection_info();
        for (name, _) in self.fields.iter().filter(|(n, _)| self.is_secret(n)) {
            masked.insert(name.clone(), Value::from(MASK));
        }
        masked
    }
}

impl Contract for Credentials {
    fn shape() -> Shape {
        Connector::credentials_shape()
    }

    /// Canonical connector key, field aliases, then connector defaults
    fn canonicalize(mapping: &mut Mapping) {
        let connector = match mapping.get("type").and_then(Value::as_str) {
            Some(key) => match Connector::from_str(key) {
                Ok(connector) => connector,
                Err(_) => return,
            },
            None => return,
        };
        mapping.insert("type".to_string(), Value::from(connector.type_key()));

        for (alias, canonical) in connector.aliases() {
            if mapping.contains_key(*canonical) {
                continue;
            }
            if let Some(value) = mapping.remove(*alias) {
                mapping.insert(canonical.to_string(), value);
            }
        }

        for (name, value) in connector.defaults() {
            mapping.entry(name).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::into_mapping;
    use crate::error::StrataError;
    use serde_json::json;

    fn postgres() -> Credentials {
        Credentials::new(Connector::Postgres, "analytics", "public")
            .with_field("host", "localhost")
            .with_field("user", "root")
            .with_field("password", "secret")
            .with_field("port", 5432)
    }

    #[test]
    fn test_credentials_round_trip() {
        let creds = postgres();
        let mapping = creds.to_mapping().unwrap();
        assert_eq!(
            Value::Object(mapping.clone()),
            json!({
                "type": "postgres",
                "database": "analytics",
                "schema": "public",
                "host": "localhost",
                "user": "root",
                "password": "secret",
                "port": 5432
            })
        );
        assert_eq!(Credentials::from_mapping(&mapping).unwrap(), creds);
    }

    #[test]
    fn test_aliases_and_defaults() {
        let raw = into_mapping(json!({
            "type": "postgresql",
            "host": "localhost",
            "user": "root",
            "pass": "secret",
            "dbname": "analytics",
            "schema": "public"
        }))
        .unwrap();
        assert_eq!(Credentials::from_mapping(&raw).unwrap(), postgres());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let raw = into_mapping(json!({
            "type": "snowflake",
            "database": "d",
            "schema": "s",
            "user": "u"
        }))
        .unwrap();
        match Credentials::from_mapping(&raw).unwrap_err() {
            StrataError::Validation { path, .. } => assert_eq!(path.to_string(), "account"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_connection_info_hides_secrets() {
        let creds = postgres();
        let info = creds.connection_info();
        assert!(!info.contains_key("password"));
        assert_eq!(info["host"], json!("localhost"));
        assert_eq!(creds.masked()["password"], json!(MASK));
    }
}
