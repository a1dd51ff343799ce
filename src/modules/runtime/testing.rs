//! Helpers for tests that need configuration entities
//!
//! These build entities from plain mappings the way a run would, and check
//! the mapping round-trip laws of [`Contract`] implementations.

use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use strata_core::{Contract, Mapping, Profile, Project, Result, RuntimeConfig, StrataError};
use strata_parser::{
    generate_base_context, generate_target_context, parse_cli_vars, CliVarsInput, ConfigRenderer,
    ProfileBuilder, ProjectBuilder,
};

use crate::adapters::{Adapter, AdapterRegistry};
use crate::assemble::{Assembler, ConfigPart};

/// Build a profile from a raw profile entry, rendering with variables only
pub fn profile_from_dict(
    raw_profile: &Value,
    profile_name: &str,
    vars: impl Into<CliVarsInput>,
) -> Result<Profile> {
    let vars = parse_cli_vars(vars)?;
    let renderer = ConfigRenderer::new(generate_base_context(&vars));
    ProfileBuilder::from_raw_profile_info(raw_profile, profile_name, &renderer, None)
}

/// Build a project from a raw project mapping, rendering with the target
/// context of `profile`
///
/// The project root comes from the raw `project-root` entry, or defaults
/// to the current working directory.
pub fn project_from_dict(
    raw_project: &Value,
    profile: &Profile,
    packages: Option<&Value>,
    vars: impl Into<CliVarsInput>,
) -> Result<Project> {
    let vars = parse_cli_vars(vars)?;
    let renderer = ConfigRenderer::new(generate_target_context(profile, &vars));
    ProjectBuilder::from_raw(raw_project, packages, &renderer)
}

/// Assemble a runtime configuration from any mix of built and raw parts
pub fn config_from_parts_or_dicts(
    project: ConfigPart<Project>,
    profile: ConfigPart<Profile>,
    packages: Option<&Value>,
    vars: impl Into<CliVarsInput>,
) -> Result<RuntimeConfig> {
    Assembler::new(vars)?.assemble(project, profile, packages)
}

/// Register `adapter` in `registry`, replacing whatever was stored under
/// its key
pub fn inject_adapter<A: Adapter + 'static>(registry: &AdapterRegistry, adapter: A) -> Arc<dyn Adapter> {
    let adapter: Arc<dyn Adapter> = Arc::new(adapter);
    registry.register_arc(Arc::clone(&adapter));
    adapter
}

/// Assert that `entity` converts to exactly `expected`
pub fn assert_to_mapping<T: Contract>(entity: &T, expected: &Mapping) {
    let mapping = entity
        .to_mapping()
        .unwrap_or_else(|e| panic!("to_mapping failed: {e}"));
    assert_eq!(&mapping, expected, "entity did not convert to the expected mapping");
}

/// Assert that `mapping` builds exactly `expected`
pub fn assert_from_mapping<T: Contract + Debug>(mapping: &Mapping, expected: &T) {
    let entity = T::from_mapping(mapping).unwrap_or_else(|e| panic!("from_mapping failed: {e}"));
    assert_eq!(&entity, expected, "mapping did not build the expected entity");
}

/// Assert both conversion directions between `entity` and `mapping`
pub fn assert_symmetric<T: Contract + Debug>(entity: &T, mapping: &Mapping) {
    assert_to_mapping(entity, mapping);
    assert_from_mapping(mapping, entity);
}

/// Assert that `mapping` is rejected with a validation error, returning it
pub fn assert_fails_validation<T: Contract + Debug>(mapping: &Mapping) -> StrataError {
    match T::from_mapping(mapping) {
        Ok(entity) => panic!("expected a validation error, built {entity:?}"),
        Err(err @ StrataError::Validation { .. }) => err,
        Err(other) => panic!("expected a validation error, got: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqlAdapter;
    use serde_json::json;
    use strata_core::{into_mapping, UserConfig};
    use strata_types::Connector;

    #[test]
    fn test_profile_and_project_from_dict() {
        let raw_profile = json!({
            "target": "bq",
            "outputs": {"bq": {
                "type": "bigquery",
                "method": "oauth",
                "project": "{{ var('gcp_project') }}",
                "dataset": "marts"
            }}
        });
        let profile = profile_from_dict(&raw_profile, "default", "{gcp_project: acme-data}").unwrap();
        assert_eq!(profile.credentials.database, "acme-data");
        assert_eq!(profile.credentials.schema, "marts");

        let raw_project = json!({"name": "p", "version": "1", "profile": "default"});
        let project = project_from_dict(&raw_project, &profile, None, "").unwrap();
        assert_eq!(project.project_root, std::env::current_dir().unwrap());

        let rooted = json!({"name": "p", "version": "1", "profile": "default", "project-root": "/srv/p"});
        let project = project_from_dict(&rooted, &profile, None, "").unwrap();
        assert_eq!(project.root(), std::path::Path::new("/srv/p"));
    }

    #[test]
    fn test_project_from_dict_rejects_non_string_root() {
        let profile = profile_from_dict(
            &json!({"target": "bq", "outputs": {"bq": {
                "type": "bigquery", "method": "oauth", "project": "p", "dataset": "d"
            }}}),
            "default",
            "",
        )
        .unwrap();
        let raw_project = json!({"name": "p", "version": "1", "profile": "default", "project-root": 7});
        let err = project_from_dict(&raw_project, &profile, None, "").unwrap_err();
        assert!(matches!(err, StrataError::Validation { .. }));
        assert_eq!(err.location().unwrap().to_string(), "project-root");
    }

    #[test]
    fn test_inject_adapter() {
        let registry = AdapterRegistry::with_builtins();
        inject_adapter(&registry, SqlAdapter::new(Connector::Bigquery));
        assert_eq!(registry.lookup("bigquery").unwrap().quote("t"), "`t`");
    }

    #[test]
    fn test_assert_helpers() {
        let config = UserConfig::default();
        let mapping = into_mapping(json!({"send_anonymous_usage_stats": true, "use_colors": true})).unwrap();
        assert_symmetric(&config, &mapping);

        let bad = into_mapping(json!({"use_colors": "yes"})).unwrap();
        let err = assert_fails_validation::<UserConfig>(&bad);
        assert_eq!(err.location().unwrap().to_string(), "use_colors");
    }
}
