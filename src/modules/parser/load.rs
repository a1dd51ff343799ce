//! Reading raw configuration files from disk

use serde_json::Value;
use std::path::Path;
use strata_core::{Result, StrataError};
use tracing::debug;

/// Project file, in the project directory
pub const PROJECT_FILE: &str = "project.yml";

/// Package dependencies file, in the project directory
pub const PACKAGES_FILE: &str = "packages.yml";

/// Profiles file, in the profiles directory
pub const PROFILES_FILE: &str = "profiles.yml";

/// Parse YAML text into a raw structure
///
/// An empty document is read as null.
pub fn parse_yaml(content: &str, origin: &str) -> Result<Value> {
    serde_yaml::from_str(content)
        .map_err(|e| StrataError::Configuration(format!("Failed to parse '{}': {}", origin, e)))
}

/// Read and parse a YAML file
pub fn read_yaml_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        StrataError::Configuration(format!("Failed to read file '{}': {}", path.display(), e))
    })?;
    debug!(path = %path.display(), "read configuration file");
    parse_yaml(&content, &path.display().to_string())
}

/// Read a YAML file that may legitimately be absent
pub fn read_optional_yaml_file(path: &Path) -> Result<Option<Value>> {
    if path.is_file() {
        read_yaml_file(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Raw project mapping with `project-root` set to `project_dir`
pub fn load_raw_project(project_dir: &Path) -> Result<Value> {
    let path = project_dir.join(PROJECT_FILE);
    let mut raw = read_yaml_file(&path)?;
    match raw.as_object_mut() {
        Some(mapping) => {
            mapping.insert(
                "project-root".to_string(),
                Value::from(project_dir.to_string_lossy().into_owned()),
            );
            Ok(raw)
        }
        None => Err(StrataError::Configuration(format!(
            "'{}' must contain a mapping",
            path.display()
        ))),
    }
}

/// Raw packages mapping, if the project declares any packages
pub fn load_raw_packages(project_dir: &Path) -> Result<Option<Value>> {
    read_optional_yaml_file(&project_dir.join(PACKAGES_FILE))
}

/// Raw profiles mapping from `profiles_dir`
pub fn load_raw_profiles(profiles_dir: &Path) -> Result<Value> {
    let path = profiles_dir.join(PROFILES_FILE);
    match read_yaml_file(&path)? {
        Value::Null => Err(StrataError::Configuration(format!(
            "'{}' is empty",
            path.display()
        ))),
        raw => Ok(raw),
    }
}
