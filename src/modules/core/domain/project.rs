//! Project-level settings

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strata_types::{Keypath, ObjectSchema, Shape};

use crate::contract::{Contract, Mapping};
use crate::error::{Result, StrataError};

/// Project names must be usable as identifiers
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A package dependency declared in the packages file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageSpec {
    /// Package on the local filesystem
    Local { local: String },
    /// Package fetched from a git repository
    Git {
        git: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<String>,
    },
    /// Package from the package hub
    Registry { package: String, version: String },
}

impl PackageSpec {
    pub(crate) fn shape() -> Shape {
        Shape::OneOf(vec![
            Shape::Object(ObjectSchema::new("local package").required("local", Shape::String)),
            Shape::Object(
                ObjectSchema::new("git package")
                    .required("git", Shape::String)
                    .optional("revision", Shape::String),
            ),
            Shape::Object(
                ObjectSchema::new("registry package")
                    .required("package", Shape::String)
                    .required("version", Shape::String),
            ),
        ])
    }

    /// Short name used in log output
    pub fn source(&self) -> &str {
        match self {
            PackageSpec::Local { local } => local,
            PackageSpec::Git { git, .. } => git,
            PackageSpec::Registry { package, .. } => package,
        }
    }
}

/// Validated project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Project {
    /// Project name (`name`)
    pub name: String,

    /// Project version
    pub version: String,

    /// Name of the profile this project connects with (`profile`)
    #[serde(rename = "profile")]
    pub profile_name: String,

    /// Directory the project lives in
    pub project_root: PathBuf,

    #[serde(default = "default_config_version")]
    pub config_version: u8,

    #[serde(default = "default_source_paths")]
    pub source_paths: Vec<String>,

    #[serde(default = "default_macro_paths")]
    pub macro_paths: Vec<String>,

    #[serde(default = "default_data_paths")]
    pub data_paths: Vec<String>,

    #[serde(default = "default_test_paths")]
    pub test_paths: Vec<String>,

    #[serde(default)]
    pub analysis_paths: Vec<String>,

    /// Defaults to every source, macro, data and analysis path
    #[serde(default)]
    pub docs_paths: Vec<String>,

    #[serde(default = "default_snapshot_paths")]
    pub snapshot_paths: Vec<String>,

    #[serde(default = "default_target_path")]
    pub target_path: String,

    #[serde(default = "default_log_path")]
    pub log_path: String,

    #[serde(default = "default_modules_path")]
    pub modules_path: String,

    /// Defaults to the target path
    #[serde(default)]
    pub clean_targets: Vec<String>,

    /// Identifier quoting per relation part (database, schema, identifier)
    #[serde(default)]
    pub quoting: BTreeMap<String, bool>,

    #[serde(default)]
    pub models: Mapping,

    #[serde(default)]
    pub seeds: Mapping,

    #[serde(default)]
    pub snapshots: Mapping,

    /// Hook SQL run before a build; kept as unrendered template source
    #[serde(default)]
    pub on_run_start: Vec<String>,

    /// Hook SQL run after a build; kept as unrendered template source
    #[serde(default)]
    pub on_run_end: Vec<String>,

    #[serde(default)]
    pub vars: Mapping,

    /// Version constraints the project requires
    #[serde(default)]
    pub require_version: Vec<String>,

    #[serde(default)]
    pub packages: Vec<PackageSpec>,
}

fn default_config_version() -> u8 {
    1
}

fn default_source_paths() -> Vec<String> {
    vec!["models".to_string()]
}

fn default_macro_paths() -> Vec<String> {
    vec!["macros".to_string()]
}

fn default_data_paths() -> Vec<String> {
    vec!["data".to_string()]
}

fn default_test_paths() -> Vec<String> {
    vec!["test".to_string()]
}

fn default_snapshot_paths() -> Vec<String> {
    vec!["snapshots".to_string()]
}

fn default_target_path() -> String {
    "target".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_modules_path() -> String {
    "modules".to_string()
}

/// Fields that accept a single string as shorthand for a one-item list
const LIST_SHORTHAND_FIELDS: &[&str] = &["on-run-start", "on-run-end", "require-version"];

impl Project {
    /// Create a project with every optional setting at its default
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        profile_name: impl Into<String>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let source_paths = default_source_paths();
        let macro_paths = default_macro_paths();
        let data_paths = default_data_paths();
        let docs_paths = [&source_paths[..], &macro_paths[..], &data_paths[..]].concat();
        let target_path = default_target_path();

        Self {
            name: name.into(),
            version: version.into(),
            profile_name: profile_name.into(),
            project_root: project_root.into(),
            config_version: default_config_version(),
            source_paths,
            macro_paths,
            data_paths,
            test_paths: default_test_paths(),
            analysis_paths: Vec::new(),
            docs_paths,
            snapshot_paths: default_snapshot_paths(),
            clean_targets: vec![target_path.clone()],
            target_path,
            log_path: default_log_path(),
            modules_path: default_modules_path(),
            quoting: BTreeMap::new(),
            models: Mapping::new(),
            seeds: Mapping::new(),
            snapshots: Mapping::new(),
            on_run_start: Vec::new(),
            on_run_end: Vec::new(),
            vars: Mapping::new(),
            require_version: Vec::new(),
            packages: Vec::new(),
        }
    }

    pub fn with_packages(mut self, packages: Vec<PackageSpec>) -> Self {
        self.packages = packages;
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.project_root
    }

    /// Project-level variable lookup
    ///
    /// Variables scoped under the project's own name take precedence over
    /// global ones.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars
            .get(&self.name)
            .and_then(Value::as_object)
            .and_then(|scoped| scoped.get(name))
            .or_else(|| self.vars.get(name))
    }

    pub(crate) fn schema() -> ObjectSchema {
        let paths = || Shape::list_of(Shape::String);
        let tree = || Shape::map_of(Shape::Any);

        ObjectSchema::new("project")
            .required("name", Shape::String)
            .required("version", Shape::String)
            .required("profile", Shape::String)
            .required("project-root", Shape::String)
            .optional("config-version", Shape::UnsignedMax(u8::MAX as u64))
            .optional("source-paths", paths())
            .optional("macro-paths", paths())
            .optional("data-paths", paths())
            .optional("test-paths", paths())
            .optional("analysis-paths", paths())
            .optional("docs-paths", paths())
            .optional("snapshot-paths", paths())
            .optional("target-path", Shape::String)
            .optional("log-path", Shape::String)
            .optional("modules-path", Shape::String)
            .optional("clean-targets", paths())
            .optional("quoting", Shape::map_of(Shape::Boolean))
            .optional("models", tree())
            .optional("seeds", tree())
            .optional("snapshots", tree())
            .optional("on-run-start", paths())
            .optional("on-run-end", paths())
            .optional("vars", tree())
            .optional("require-version", paths())
            .optional("packages", Shape::list_of(PackageSpec::shape()))
    }
}

/// Read a string list field, falling back to `default` when absent or malformed
fn string_list(mapping: &Mapping, key: &str, default: fn() -> Vec<String>) -> Vec<String> {
    match mapping.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => default(),
    }
}

impl Contract for Project {
    fn shape() -> Shape {
        Shape::Object(Self::schema())
    }

    fn canonicalize(mapping: &mut Mapping) {
        for key in LIST_SHORTHAND_FIELDS {
            if let Some(Value::String(single)) = mapping.get(*key) {
                let list = Value::Array(vec![Value::String(single.clone())]);
                mapping.insert(key.to_string(), list);
            }
        }

        if !mapping.contains_key("docs-paths") {
            let mut docs = string_list(mapping, "source-paths", default_source_paths);
            docs.extend(string_list(mapping, "macro-paths", default_macro_paths));
            docs.extend(string_list(mapping, "data-paths", default_data_paths));
            docs.extend(string_list(mapping, "analysis-paths", Vec::new));
            mapping.insert("docs-paths".to_string(), Value::from(docs));
        }

        if !mapping.contains_key("clean-targets") {
            let target = match mapping.get("target-path") {
                Some(Value::String(path)) => path.clone(),
                _ => default_target_path(),
            };
            mapping.insert("clean-targets".to_string(), Value::from(vec![target]));
        }
    }

    fn validate(&self) -> Result<()> {
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(StrataError::validation(
                Keypath::from_keys(["name"]),
                "identifier made of letters, digits and underscores",
                format!("`{}`", self.name),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(StrataError::validation(
                Keypath::from_keys(["version"]),
                "non-empty string",
                "empty string",
            ));
        }
        if !matches!(self.config_version, 1 | 2) {
            return Err(StrataError::validation(
                Keypath::from_keys(["config-version"]),
                "1 or 2",
                self.config_version.to_string(),
            ));
        }
        if self.project_root.as_os_str().is_empty() {
            return Err(StrataError::validation(
                Keypath::from_keys(["project-root"]),
                "directory path",
                "empty string",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::into_mapping;
    use serde_json::json;

    fn minimal() -> Mapping {
        into_mapping(json!({
            "name": "my_test_project",
            "version": "0.0.1",
            "profile": "default",
            "project-root": "/invalid-root-path"
        }))
        .unwrap()
    }

    #[test]
    fn test_project_defaults() {
        let project = Project::from_mapping(&minimal()).unwrap();
        assert_eq!(
            project,
            Project::new("my_test_project", "0.0.1", "default", "/invalid-root-path")
        );
        assert_eq!(project.docs_paths, vec!["models", "macros", "data"]);
        assert_eq!(project.clean_targets, vec!["target"]);
    }

    #[test]
    fn test_project_round_trip() {
        let project = Project::new("my_test_project", "0.0.1", "default", "/root")
            .with_var("start_date", "2020-01-01")
            .with_packages(vec![
                PackageSpec::Local {
                    local: "../utils".into(),
                },
                PackageSpec::Git {
                    git: "https://example.com/pkg.git".into(),
                    revision: Some("v1".into()),
                },
                PackageSpec::Registry {
                    package: "org/pkg".into(),
                    version: "0.2.0".into(),
                },
            ]);
        let mapping = project.to_mapping().unwrap();
        assert_eq!(mapping["profile"], json!("default"));
        assert_eq!(mapping["packages"][1], json!({"git": "https://example.com/pkg.git", "revision": "v1"}));
        assert_eq!(Project::from_mapping(&mapping).unwrap(), project);
    }

    #[test]
    fn test_single_hook_shorthand() {
        let mut raw = minimal();
        raw.insert("on-run-start".into(), json!("grant select on {{ this }}"));
        let project = Project::from_mapping(&raw).unwrap();
        assert_eq!(project.on_run_start, vec!["grant select on {{ this }}"]);
    }

    #[test]
    fn test_missing_profile_rejected() {
        let mut raw = minimal();
        raw.remove("profile");
        let err = Project::from_mapping(&raw).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "profile");
    }

    #[test]
    fn test_bad_package_rejected() {
        let mut raw = minimal();
        raw.insert("packages".into(), json!([{"local": "a"}, {"tarball": "x"}]));
        let err = Project::from_mapping(&raw).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "packages[1]");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut raw = minimal();
        raw.insert("name".into(), json!("my-project"));
        let err = Project::from_mapping(&raw).unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "name");
    }

    #[test]
    fn test_out_of_range_config_version() {
        let mut raw = minimal();
        raw.insert("config-version".into(), json!(300));
        let err = Project::from_mapping(&raw).unwrap_err();
        assert!(matches!(err, StrataError::Validation { .. }));
        assert_eq!(err.location().unwrap().to_string(), "config-version");
    }

    #[test]
    fn test_scoped_vars() {
        let project = Project::new("proj", "1", "default", "/root")
            .with_var("limit", 10)
            .with_var("proj", json!({"limit": 20}));
        assert_eq!(project.var("limit"), Some(&json!(20)));
        assert_eq!(project.var("missing"), None);
    }
}
