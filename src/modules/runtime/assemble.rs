//! Runtime configuration assembly from entities or raw structures

use serde_json::Value;
use std::path::{Path, PathBuf};
use strata_core::{CliVars, Profile, Project, Result, RuntimeArgs, RuntimeConfig, StrataError, NULL_PROFILE_DIR};
use strata_parser::{
    generate_base_context, generate_target_context, load, parse_cli_vars, CliVarsInput,
    ConfigRenderer, ProfileBuilder, ProjectBuilder, RenderExemptions,
};
use strata_types::Keypath;
use tracing::{debug, info};

/// A configuration piece that is either already built or still raw
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigPart<T> {
    Built(T),
    Raw(Value),
}

/// Builds [`RuntimeConfig`] values from mixed built and raw parts
///
/// Raw profiles are rendered with the base context (variables only). Raw
/// projects are rendered with the target context of the resolved profile.
#[derive(Debug, Clone)]
pub struct Assembler {
    vars: CliVars,
    profile_dir: PathBuf,
    target: Option<String>,
}

impl Assembler {
    /// Create an assembler; textual variables are parsed here
    pub fn new(vars: impl Into<CliVarsInput>) -> Result<Self> {
        Ok(Self {
            vars: parse_cli_vars(vars)?,
            profile_dir: PathBuf::from(NULL_PROFILE_DIR),
            target: None,
        })
    }

    pub fn with_profile_dir(mut self, profile_dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = profile_dir.into();
        self
    }

    /// Select a target instead of the profile's own `target` entry
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn vars(&self) -> &CliVars {
        &self.vars
    }

    fn base_renderer(&self) -> ConfigRenderer {
        ConfigRenderer::new(generate_base_context(&self.vars))
    }

    fn args(&self, profile_dir: &Path) -> RuntimeArgs {
        let args = RuntimeArgs::new(self.vars.clone(), profile_dir);
        match &self.target {
            Some(target) => args.with_target(target.clone()),
            None => args,
        }
    }

    /// Name of the profile a project part asks for
    fn profile_name(&self, project: &ConfigPart<Project>) -> Result<String> {
        let raw = match project {
            ConfigPart::Built(project) => return Ok(project.profile_name.clone()),
            ConfigPart::Raw(raw) => raw,
        };

        let missing = || StrataError::Configuration("the project does not name a profile".to_string());
        let raw_name = raw.get("profile").ok_or_else(missing)?;
        let rendered = self.base_renderer().render_at(
            raw_name,
            &Keypath::from_keys(["profile"]),
            &RenderExemptions::none(),
        )?;
        match rendered {
            Value::String(name) if !name.is_empty() => Ok(name),
            _ => Err(missing()),
        }
    }

    fn build_project(
        &self,
        project: ConfigPart<Project>,
        packages: Option<&Value>,
        profile: &Profile,
    ) -> Result<Project> {
        match project {
            ConfigPart::Built(project) => {
                if packages.is_some() {
                    debug!(project = %project.name, "ignoring packages for an already built project");
                }
                Ok(project)
            }
            ConfigPart::Raw(raw) => {
                let renderer = ConfigRenderer::new(generate_target_context(profile, &self.vars));
                ProjectBuilder::from_raw(&raw, packages, &renderer)
            }
        }
    }

    /// Merge a project and a profile into a runtime configuration
    pub fn assemble(
        &self,
        project: ConfigPart<Project>,
        profile: ConfigPart<Profile>,
        packages: Option<&Value>,
    ) -> Result<RuntimeConfig> {
        let profile_name = self.profile_name(&project)?;

        let profile = match profile {
            ConfigPart::Built(profile) => {
                if let Some(target) = self.target.as_deref() {
                    if target != profile.target_name {
                        return Err(StrataError::Configuration(format!(
                            "Target '{}' was requested, but the supplied profile '{}' is built for target '{}'",
                            target, profile.profile_name, profile.target_name
                        )));
                    }
                }
                profile
            }
            ConfigPart::Raw(raw) => ProfileBuilder::from_raw_profile_info(
                &raw,
                &profile_name,
                &self.base_renderer(),
                self.target.as_deref(),
            )?,
        };

        let project = self.build_project(project, packages, &profile)?;
        RuntimeConfig::from_parts(project, profile, self.args(&self.profile_dir))
    }

    /// Read the project, packages and profiles files and assemble them
    pub fn load(&self, project_dir: &Path, profiles_dir: &Path) -> Result<RuntimeConfig> {
        let raw_project = load::load_raw_project(project_dir)?;
        let packages = load::load_raw_packages(project_dir)?;
        let raw_profiles = load::load_raw_profiles(profiles_dir)?;

        let project = ConfigPart::Raw(raw_project);
        let profile_name = self.profile_name(&project)?;
        let profile = ProfileBuilder::from_raw_profiles(
            &raw_profiles,
            &profile_name,
            &self.base_renderer(),
            self.target.as_deref(),
        )?;

        let project = self.build_project(project, packages.as_ref(), &profile)?;
        let config = RuntimeConfig::from_parts(project, profile, self.args(profiles_dir))?;
        info!(
            project = %config.project_name(),
            target = %config.target_name(),
            adapter = config.adapter_type(),
            "loaded runtime config"
        );
        Ok(config)
    }
}
