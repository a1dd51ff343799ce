//! Project building from raw project-file content

use serde_json::Value;
use std::path::PathBuf;
use strata_core::{into_mapping, Contract, Project, Result, StrataError};
use strata_types::Keypath;
use tracing::debug;

use crate::renderer::{render, ConfigRenderer, RenderExemptions};

/// Keypaths whose values are evaluated later, at hook execution time
pub const HOOK_KEYPATHS: &[&str] = &["on-run-start", "on-run-end", "**.pre-hook", "**.post-hook"];

/// Builds [`Project`] entities from raw project structures
pub struct ProjectBuilder;

impl ProjectBuilder {
    /// Render a raw project mapping and validate it into a [`Project`]
    ///
    /// `packages` is the content of a packages file (a mapping with a
    /// `packages` list). Hooks are kept verbatim.
    pub fn render_from_dict(
        project_root: PathBuf,
        raw_project: &Value,
        packages: Option<&Value>,
        renderer: &ConfigRenderer,
    ) -> Result<Project> {
        if !raw_project.is_object() {
            return Err(StrataError::Configuration(
                "project file must contain a mapping".to_string(),
            ));
        }

        let exemptions = RenderExemptions::new(HOOK_KEYPATHS);
        let mut mapping = into_mapping(render(renderer.context(), raw_project, &exemptions)?)?;

        if let Some(packages) = Self::render_packages(packages, renderer)? {
            mapping.insert("packages".to_string(), packages);
        }

        mapping.insert(
            "project-root".to_string(),
            Value::from(project_root.to_string_lossy().into_owned()),
        );

        let project = Project::from_mapping(&mapping)?;
        debug!(
            project = %project.name,
            root = %project.project_root.display(),
            packages = project.packages.len(),
            "built project"
        );
        for package in &project.packages {
            debug!(project = %project.name, source = package.source(), "declared package");
        }
        Ok(project)
    }

    /// Like [`ProjectBuilder::render_from_dict`], reading the root from the
    /// raw `project-root` entry
    ///
    /// The current working directory is used when the entry is absent.
    pub fn from_raw(
        raw_project: &Value,
        packages: Option<&Value>,
        renderer: &ConfigRenderer,
    ) -> Result<Project> {
        let mut raw = match raw_project {
            Value::Object(raw) => raw.clone(),
            _ => {
                return Err(StrataError::Configuration(
                    "project file must contain a mapping".to_string(),
                ))
            }
        };

        let project_root = match raw.remove("project-root") {
            Some(Value::String(root)) => PathBuf::from(root),
            Some(other) => {
                return Err(StrataError::validation(
                    Keypath::from_keys(["project-root"]),
                    "string",
                    other.to_string(),
                ))
            }
            None => std::env::current_dir()?,
        };

        Self::render_from_dict(project_root, &Value::Object(raw), packages, renderer)
    }

    fn render_packages(packages: Option<&Value>, renderer: &ConfigRenderer) -> Result<Option<Value>> {
        let packages = match packages {
            None => return Ok(None),
            Some(Value::Null) => return Ok(Some(Value::Array(Vec::new()))),
            Some(Value::Object(file)) => file.get("packages").cloned().unwrap_or(Value::Null),
            Some(_) => {
                return Err(StrataError::Configuration(
                    "packages file must contain a mapping with a 'packages' list".to_string(),
                ))
            }
        };

        let packages = match packages {
            Value::Null => Value::Array(Vec::new()),
            list @ Value::Array(_) => list,
            other => {
                return Err(StrataError::validation(
                    Keypath::from_keys(["packages"]),
                    "list of package specifications",
                    other.to_string(),
                ))
            }
        };

        renderer
            .render_at(&packages, &Keypath::from_keys(["packages"]), &RenderExemptions::none())
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{generate_base_context, generate_target_context};
    use serde_json::json;
    use strata_core::{CliVars, Credentials, PackageSpec, Profile};
    use strata_types::Connector;

    fn target_renderer(vars: CliVars) -> ConfigRenderer {
        let creds = Credentials::new(Connector::Postgres, "analytics", "public")
            .with_field("host", "localhost")
            .with_field("user", "root")
            .with_field("password", "secret")
            .with_field("port", 5432);
        let profile = Profile::new("default", "dev", creds);
        ConfigRenderer::new(generate_target_context(&profile, &vars))
    }

    fn raw_project() -> Value {
        json!({
            "name": "my_test_project",
            "version": "0.0.1",
            "profile": "default",
            "target-path": "{{ var('target_dir', 'target') }}",
            "on-run-start": "{{ adapter.grant('select') }}",
            "models": {
                "schema": "{{ target.schema }}_models",
                "post-hook": ["grant select on {{ this }} to reporter"]
            }
        })
    }

    #[test]
    fn test_render_from_dict() {
        let project = ProjectBuilder::render_from_dict(
            PathBuf::from("/root"),
            &raw_project(),
            None,
            &target_renderer(CliVars::new().with("target_dir", "build")),
        )
        .unwrap();

        assert_eq!(project.name, "my_test_project");
        assert_eq!(project.project_root, PathBuf::from("/root"));
        assert_eq!(project.target_path, "build");
        assert_eq!(project.clean_targets, vec!["build".to_string()]);
        assert_eq!(project.on_run_start, vec!["{{ adapter.grant('select') }}".to_string()]);
        assert_eq!(project.models["schema"], json!("public_models"));
        assert_eq!(
            project.models["post-hook"],
            json!(["grant select on {{ this }} to reporter"])
        );
    }

    #[test]
    fn test_packages_are_rendered_and_merged() {
        let packages = json!({"packages": [
            {"local": "{{ var('pkg_dir') }}"},
            {"git": "https://example.com/utils.git", "revision": "0.1.0"},
            {"package": "org/helpers", "version": "1.2.0"}
        ]});
        let project = ProjectBuilder::render_from_dict(
            PathBuf::from("/root"),
            &raw_project(),
            Some(&packages),
            &target_renderer(CliVars::new().with("pkg_dir", "../shared")),
        )
        .unwrap();

        assert_eq!(
            project.packages,
            vec![
                PackageSpec::Local { local: "../shared".to_string() },
                PackageSpec::Git {
                    git: "https://example.com/utils.git".to_string(),
                    revision: Some("0.1.0".to_string()),
                },
                PackageSpec::Registry {
                    package: "org/helpers".to_string(),
                    version: "1.2.0".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_bad_package_is_validation_error() {
        let packages = json!({"packages": [{"tarball": "x"}]});
        let err = ProjectBuilder::render_from_dict(
            PathBuf::from("/root"),
            &raw_project(),
            Some(&packages),
            &target_renderer(CliVars::new()),
        )
        .unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "packages[0]");
    }

    #[test]
    fn test_target_not_available_in_base_context() {
        let renderer = ConfigRenderer::new(generate_base_context(&CliVars::new()));
        let err = ProjectBuilder::render_from_dict(PathBuf::from("/root"), &raw_project(), None, &renderer)
            .unwrap_err();
        assert_eq!(err.location().unwrap().to_string(), "models.schema");
    }

    #[test]
    fn test_from_raw_project_root() {
        let mut raw = raw_project();
        raw["project-root"] = json!("/srv/project");
        let renderer = target_renderer(CliVars::new());
        let project = ProjectBuilder::from_raw(&raw, None, &renderer).unwrap();
        assert_eq!(project.root(), std::path::Path::new("/srv/project"));

        let project = ProjectBuilder::from_raw(&raw_project(), None, &renderer).unwrap();
        assert_eq!(project.project_root, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_non_mapping_rejected() {
        let renderer = target_renderer(CliVars::new());
        let err = ProjectBuilder::render_from_dict(PathBuf::from("/root"), &json!([1]), None, &renderer)
            .unwrap_err();
        assert!(matches!(err, StrataError::Configuration(_)));
    }
}
