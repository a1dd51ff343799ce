//! Resolved connection profile

use serde::{Deserialize, Serialize};
use strata_types::{Connector, Keypath, ObjectSchema, Shape};

use super::Credentials;
use crate::contract::{canonicalize_child, Contract, Mapping};
use crate::error::{Result, StrataError};

/// User-level settings read from the `config` block of a profiles file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_true")]
    pub send_anonymous_usage_stats: bool,

    #[serde(default = "default_true")]
    pub use_colors: bool,
}

fn default_true() -> bool {
    true
}

fn default_threads() -> u32 {
    1
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            send_anonymous_usage_stats: true,
            use_colors: true,
        }
    }
}

impl UserConfig {
    pub(crate) fn schema() -> ObjectSchema {
        ObjectSchema::new("config")
            .optional("send_anonymous_usage_stats", Shape::Boolean)
            .optional("use_colors", Shape::Boolean)
    }
}

impl Contract for UserConfig {
    fn shape() -> Shape {
        Shape::Object(Self::schema())
    }
}

/// A profile with its active target selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Name of the profile in the profiles file
    pub profile_name: String,

    /// Name of the selected target
    pub target_name: String,

    /// Number of concurrent model builds (default: 1)
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// User-level settings
    #[serde(default)]
    pub config: UserConfig,

    /// Connection parameters of the selected target
    pub credentials: Credentials,
}

impl Profile {
    /// Create a single-threaded profile with default user settings
    pub fn new(
        profile_name: impl Into<String>,
        target_name: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            target_name: target_name.into(),
            threads: default_threads(),
            config: UserConfig::default(),
            credentials,
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_config(mut self, config: UserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connector(&self) -> Connector {
        self.credentials.connector
    }

    pub(crate) fn schema() -> ObjectSchema {
        ObjectSchema::new("profile")
            .required("profile_name", Shape::String)
            .required("target_name", Shape::String)
            .optional("threads", Shape::UnsignedMax(u32::MAX as u64))
            .optional("config", Shape::Object(UserConfig::schema()))
            .required("credentials", Connector::credentials_shape())
    }
}

impl Contract for Profile {
    fn shape() -> Shape {
        Shape::Object(Self::schema())
    }

    fn canonicalize(mapping: &mut Mapping) {
        canonicalize_child::<Credentials>(mapping, "credentials");
    }

    fn validate(&self) -> Result<()> {
        if self.profile_name.is_empty() {
            return Err(StrataError::validation(
                Keypath::from_keys(["profile_name"]),
                "non-empty string",
                "empty string",
            ));
        }
        if self.threads == 0 {
            return Err(StrataError::validation(
                Keypath::from_keys(["threads"]),
                "integer of at least 1",
                "0",
            ));
        }
        Ok(())
    }
}
