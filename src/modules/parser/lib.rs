//! Configuration parsing and rendering for Strata
//!
//! This crate turns raw configuration structures into validated entities:
//! it parses command-line variables, builds rendering contexts, renders
//! template expressions, and builds profiles and projects.

pub mod context;
pub mod load;
pub mod profile;
pub mod project;
pub mod renderer;
pub mod template;
pub mod vars;

pub use context::{generate_base_context, generate_target_context, ContextEntry, RenderContext};
pub use profile::ProfileBuilder;
pub use project::ProjectBuilder;
pub use renderer::{render, ConfigRenderer, RenderExemptions};
pub use vars::{parse_cli_vars, CliVarsInput};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::CliVars;

    #[test]
    fn test_profile_then_project() {
        let vars = parse_cli_vars("{env: prod}").unwrap();
        let raw_profiles = json!({
            "default": {
                "target": "{{ var('env') }}",
                "outputs": {
                    "prod": {
                        "type": "snowflake",
                        "account": "acme",
                        "user": "loader",
                        "password": "secret",
                        "database": "ANALYTICS",
                        "schema": "{{ var('env') }}_marts",
                        "threads": 8
                    }
                }
            }
        });

        let base = ConfigRenderer::new(generate_base_context(&vars));
        let profile = ProfileBuilder::from_raw_profiles(&raw_profiles, "default", &base, None).unwrap();
        assert_eq!(profile.target_name, "prod");
        assert_eq!(profile.threads, 8);

        let raw_project = json!({
            "name": "warehouse",
            "version": "1.0",
            "profile": "default",
            "project-root": "/srv/warehouse",
            "vars": {"schema_name": "{{ target.schema }}"}
        });
        let target = ConfigRenderer::new(generate_target_context(&profile, &vars));
        let project = ProjectBuilder::from_raw(&raw_project, None, &target).unwrap();
        assert_eq!(project.var("schema_name"), Some(&json!("prod_marts")));
        assert!(project.packages.is_empty());

        assert!(generate_base_context(&CliVars::new()).value("target").is_none());
    }
}
