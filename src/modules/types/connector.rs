//! Adapter connector type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::shape::{ObjectSchema, Shape, TaggedSchema};

/// Supported warehouse connector types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    /// PostgreSQL database
    Postgres,
    /// Amazon Redshift
    Redshift,
    /// Snowflake
    Snowflake,
    /// Google BigQuery
    Bigquery,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_key())
    }
}

impl FromStr for Connector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Connector::Postgres),
            "redshift" => Ok(Connector::Redshift),
            "snowflake" => Ok(Connector::Snowflake),
            "bigquery" | "bq" => Ok(Connector::Bigquery),
            _ => Err(format!("Unknown connector type: {}", s)),
        }
    }
}

impl Connector {
    /// Returns all supported connector types
    pub fn all() -> &'static [Connector] {
        &[
            Connector::Postgres,
            Connector::Redshift,
            Connector::Snowflake,
            Connector::Bigquery,
        ]
    }

    /// Key under which adapters for this connector are registered
    pub fn type_key(&self) -> &'static str {
        match self {
            Connector::Postgres => "postgres",
            Connector::Redshift => "redshift",
            Connector::Snowflake => "snowflake",
            Connector::Bigquery => "bigquery",
        }
    }

    /// Alternate credential field names, as `(alias, canonical)` pairs
    pub fn aliases(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Connector::Postgres | Connector::Redshift => {
                &[("pass", "password"), ("dbname", "database")]
            }
            Connector::Bigquery => &[("project", "database"), ("dataset", "schema")],
            Connector::Snowflake => &[],
        }
    }

    /// Values filled in for optional credential fields that were left out
    pub fn defaults(&self) -> Vec<(&'static str, Value)> {
        match self {
            Connector::Postgres => vec![("port", Value::from(5432))],
            Connector::Redshift => vec![
                ("port", Value::from(5432)),
                ("method", Value::from("database")),
            ],
            Connector::Snowflake | Connector::Bigquery => Vec::new(),
        }
    }

    /// Credential fields that must never be exposed to templates or output
    pub fn secret_fields(&self) -> &'static [&'static str] {
        match self {
            Connector::Postgres | Connector::Redshift => &["password"],
            Connector::Snowflake => &["password", "private_key_path", "token"],
            Connector::Bigquery => &["keyfile", "keyfile_json"],
        }
    }

    /// Schema of the credential block for this connector
    pub fn credentials_schema(&self) -> ObjectSchema {
        let base = ObjectSchema::new("credentials")
            .required("type", Shape::String)
            .required("database", Shape::String)
            .required("schema", Shape::String);

        match self {
            Connector::Postgres => base
                .required("host", Shape::String)
                .required("user", Shape::String)
                .required("password", Shape::String)
                .required("port", Shape::UnsignedMax(u16::MAX as u64))
                .optional("search_path", Shape::String)
                .optional("keepalives_idle", Shape::Unsigned)
                .optional("sslmode", Shape::String),
            Connector::Redshift => base
                .required("host", Shape::String)
                .required("user", Shape::String)
                .required("port", Shape::UnsignedMax(u16::MAX as u64))
                .optional("password", Shape::String)
                .optional("method", Shape::String)
                .optional("cluster_id", Shape::String)
                .optional("iam_duration_seconds", Shape::Unsigned)
                .optional("search_path", Shape::String),
            Connector::Snowflake => base
                .required("account", Shape::String)
                .required("user", Shape::String)
                .optional("password", Shape::String)
                .optional("role", Shape::String)
                .optional("warehouse", Shape::String)
                .optional("authenticator", Shape::String)
                .optional("private_key_path", Shape::String)
                .optional("token", Shape::String)
                .optional("client_session_keep_alive", Shape::Boolean),
            Connector::Bigquery => base
                .required("method", Shape::String)
                .optional("keyfile", Shape::String)
                .optional("keyfile_json", Shape::map_of(Shape::Any))
                .optional("location", Shape::String)
                .optional("timeout_seconds", Shape::Unsigned)
                .optional("priority", Shape::String),
        }
    }

    /// Credential schemas of every connector, selected by the `type` field
    pub fn credentials_shape() -> Shape {
        let schema = Connector::all()
            .iter()
            .fold(TaggedSchema::new("type"), |schema, c| {
                schema.variant(c.type_key(), c.credentials_schema())
            });
        Shape::Tagged(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypath::Keypath;
    use serde_json::json;

    #[test]
    fn test_connector_from_str() {
        assert_eq!(Connector::from_str("postgres").unwrap(), Connector::Postgres);
        assert_eq!(Connector::from_str("postgresql").unwrap(), Connector::Postgres);
        assert_eq!(Connector::from_str("Redshift").unwrap(), Connector::Redshift);
        assert_eq!(Connector::from_str("snowflake").unwrap(), Connector::Snowflake);
        assert_eq!(Connector::from_str("bq").unwrap(), Connector::Bigquery);
        assert!(Connector::from_str("unknown").is_err());
    }

    #[test]
    fn test_connector_display() {
        assert_eq!(Connector::Postgres.to_string(), "postgres");
        assert_eq!(Connector::Redshift.to_string(), "redshift");
        assert_eq!(Connector::Snowflake.to_string(), "snowflake");
        assert_eq!(Connector::Bigquery.to_string(), "bigquery");
    }

    #[test]
    fn test_connector_serde() {
        let json = serde_json::to_string(&Connector::Postgres).unwrap();
        assert_eq!(json, "\"postgres\"");

        let connector: Connector = serde_json::from_str("\"snowflake\"").unwrap();
        assert_eq!(connector, Connector::Snowflake);
    }

    #[test]
    fn test_credentials_shape_selects_variant() {
        let shape = Connector::credentials_shape();
        let ok = json!({
            "type": "postgres",
            "host": "localhost",
            "user": "root",
            "password": "secret",
            "port": 5432,
            "database": "analytics",
            "schema": "public"
        });
        assert!(shape.validate(&ok));

        let err = shape
            .check(&json!({"type": "postgres", "database": "d", "schema": "s"}), &Keypath::root())
            .unwrap_err();
        assert_eq!(err.path.to_string(), "host");

        let err = shape
            .check(&json!({"type": "oracle"}), &Keypath::root())
            .unwrap_err();
        assert_eq!(err.path.to_string(), "type");
    }
}
