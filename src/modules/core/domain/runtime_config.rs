//! Merged runtime configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use strata_types::{Keypath, ObjectSchema, Shape};
use tracing::debug;

use super::{CliVars, Credentials, Profile, Project};
use crate::contract::{canonicalize_child, Contract, Mapping};
use crate::error::{Result, StrataError};

/// Profile directory used when the caller has none to offer
pub const NULL_PROFILE_DIR: &str = "/dev/null";

/// Minimal argument bundle supplied alongside a project and profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeArgs {
    /// Variable overrides
    #[serde(default)]
    pub vars: CliVars,

    /// Directory the profiles file was discovered in
    pub profile_dir: PathBuf,

    /// Target requested on the command line, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RuntimeArgs {
    pub fn new(vars: CliVars, profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            profile_dir: profile_dir.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub(crate) fn schema() -> ObjectSchema {
        ObjectSchema::new("args")
            .optional("vars", Shape::map_of(Shape::Any))
            .required("profile_dir", Shape::String)
            .optional("target", Shape::String)
    }
}

impl Default for RuntimeArgs {
    fn default() -> Self {
        Self::new(CliVars::new(), NULL_PROFILE_DIR)
    }
}

impl Contract for RuntimeArgs {
    fn shape() -> Shape {
        Shape::Object(Self::schema())
    }
}

/// A project bound to the profile it runs against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub project: Project,
    pub profile: Profile,
    pub args: RuntimeArgs,
}

impl RuntimeConfig {
    /// Combine a project and profile
    ///
    /// Both parts are checked against their schemas first, so entities
    /// assembled field by field are held to the same rules as parsed ones.
    /// Fails when the project asks for a different profile than the one
    /// that was resolved.
    pub fn from_parts(project: Project, profile: Profile, args: RuntimeArgs) -> Result<Self> {
        project.verify().map_err(|e| e.nested_under("project"))?;
        profile.verify().map_err(|e| e.nested_under("profile"))?;

        if project.profile_name != profile.profile_name {
            return Err(StrataError::Configuration(format!(
                "Project '{}' expects profile '{}', but profile '{}' was resolved",
                project.name, project.profile_name, profile.profile_name
            )));
        }

        debug!(
            project = %project.name,
            profile = %profile.profile_name,
            target = %profile.target_name,
            "assembled runtime config"
        );

        Ok(Self {
            project,
            profile,
            args,
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project.name
    }

    pub fn target_name(&self) -> &str {
        &self.profile.target_name
    }

    pub fn threads(&self) -> u32 {
        self.profile.threads
    }

    pub fn credentials(&self) -> &Credentials {
        &self.profile.credentials
    }

    /// Registry key of the adapter this configuration connects through
    pub fn adapter_type(&self) -> &'static str {
        self.profile.connector().type_key()
    }

    pub fn cli_vars(&self) -> &CliVars {
        &self.args.vars
    }

    /// Variable lookup; command-line values override project values
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.args.vars.get(name).or_else(|| self.project.var(name))
    }

    /// Mapping representation with secret credential values masked
    pub fn masked_mapping(&self) -> Result<Mapping> {
        let mut mapping = self.to_mapping()?;
        if let Some(Value::Object(profile)) = mapping.get_mut("profile") {
            profile.insert(
                "credentials".to_string(),
                Value::Object(self.profile.credentials.masked()),
            );
        }
        Ok(mapping)
    }
}

impl Contract for RuntimeConfig {
    fn shape() -> Shape {
        Shape::Object(
            ObjectSchema::new("runtime config")
                .required("project", Shape::Object(Project::schema()))
                .required("profile", Shape::Object(Profile::schema()))
                .required("args", Shape::Object(RuntimeArgs::schema())),
        )
    }

    fn canonicalize(mapping: &mut Mapping) {
        canonicalize_child::<Project>(mapping, "project");
        canonicalize_child::<Profile>(mapping, "profile");
    }

    fn validate(&self) -> Result<()> {
        self.project.validate().map_err(|e| e.nested_under("project"))?;
        self.profile.validate().map_err(|e| e.nested_under("profile"))?;
        if self.project.profile_name != self.profile.profile_name {
            return Err(StrataError::validation(
                Keypath::from_keys(["profile", "profile_name"]),
                format!("`{}` (the project's profile)", self.project.profile_name),
                format!("`{}`", self.profile.profile_name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_types::Connector;

    fn profile(name: &str) -> Profile {
        let creds = Credentials::new(Connector::Postgres, "analytics", "public")
            .with_field("host", "localhost")
            .with_field("user", "root")
            .with_field("password", "secret")
            .with_field("port", 5432);
        Profile::new(name, "dev", creds)
    }

    fn project(profile: &str) -> Project {
        Project::new("my_test_project", "0.0.1", profile, "/root")
            .with_var("limit", 10)
    }

    #[test]
    fn test_from_parts() {
        let vars = CliVars::new().with("limit", 5);
        let config =
            RuntimeConfig::from_parts(project("default"), profile("default"), RuntimeArgs::new(vars, NULL_PROFILE_DIR))
                .unwrap();
        assert_eq!(config.project_name(), "my_test_project");
        assert_eq!(config.target_name(), "dev");
        assert_eq!(config.adapter_type(), "postgres");
        assert_eq!(config.var("limit"), Some(&json!(5)));
    }

    #[test]
    fn test_profile_mismatch() {
        let err = RuntimeConfig::from_parts(project("a"), profile("b"), RuntimeArgs::default())
            .unwrap_err();
        assert!(matches!(err, StrataError::Configuration(_)));
        assert!(err.to_string().contains("expects profile 'a'"));
    }

    #[test]
    fn test_runtime_config_round_trip() {
        let config = RuntimeConfig::from_parts(
            project("default"),
            profile("default"),
            RuntimeArgs::default().with_target("dev"),
        )
        .unwrap();
        let mapping = config.to_mapping().unwrap();
        assert_eq!(mapping["args"]["profile_dir"], json!("/dev/null"));
        assert_eq!(RuntimeConfig::from_mapping(&mapping).unwrap(), config);
    }

    #[test]
    fn test_mapping_mismatch_is_validation_error() {
        let config =
            RuntimeConfig::from_parts(project("default"), profile("default"), RuntimeArgs::default())
                .unwrap();
        let mut mapping = config.to_mapping().unwrap();
        mapping["profile"]["profile_name"] = json!("other");
        let err = RuntimeConfig::from_mapping(&mapping).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "profile.profile_name");
    }

    #[test]
    fn test_from_parts_rejects_unvalidated_parts() {
        let err = RuntimeConfig::from_parts(
            Project::new("bad-name", "0.0.1", "default", "/root"),
            profile("default"),
            RuntimeArgs::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StrataError::Validation { .. }));
        assert_eq!(err.location().unwrap().to_string(), "project.name");

        let err = RuntimeConfig::from_parts(
            project("default"),
            profile("default").with_threads(0),
            RuntimeArgs::default(),
        )
        .unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "profile.threads");

        let bare = Profile::new("default", "dev", Credentials::new(Connector::Postgres, "d", "s"));
        let err = RuntimeConfig::from_parts(project("default"), bare, RuntimeArgs::default()).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "profile.credentials.host");

        let err = RuntimeConfig::from_parts(
            Project::new("my_test_project", "0.0.1", "default", ""),
            profile("default"),
            RuntimeArgs::default(),
        )
        .unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "project.project-root");
    }

    #[test]
    fn test_nested_invariant_path() {
        let config =
            RuntimeConfig::from_parts(project("default"), profile("default"), RuntimeArgs::default())
                .unwrap();
        let mut mapping = config.to_mapping().unwrap();
        mapping["project"]["name"] = json!("bad-name");
        let err = RuntimeConfig::from_mapping(&mapping).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "project.name");

        let mut mapping = config.to_mapping().unwrap();
        mapping["profile"]["threads"] = json!(0);
        let err = RuntimeConfig::from_mapping(&mapping).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "profile.threads");
    }

    #[test]
    fn test_masked_mapping() {
        let config =
            RuntimeConfig::from_parts(project("default"), profile("default"), RuntimeArgs::default())
                .unwrap();
        let masked = config.masked_mapping().unwrap();
        assert_eq!(masked["profile"]["credentials"]["password"], json!("********"));
        assert_eq!(masked["profile"]["credentials"]["host"], json!("localhost"));
    }
}
