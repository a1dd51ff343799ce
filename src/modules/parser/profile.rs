//! Profile building from raw profiles-file content

use serde_json::Value;
use strata_core::{into_mapping, Contract, Mapping, Profile, Result, StrataError, UserConfig};
use strata_types::Keypath;
use tracing::debug;

use crate::renderer::{ConfigRenderer, RenderExemptions};

/// Builds [`Profile`] entities from raw profile structures
pub struct ProfileBuilder;

impl ProfileBuilder {
    /// Build the profile named `profile_name` out of a whole profiles file
    ///
    /// The file's top-level `config` entry, if any, becomes the profile's
    /// user configuration.
    pub fn from_raw_profiles(
        raw_profiles: &Value,
        profile_name: &str,
        renderer: &ConfigRenderer,
        target_override: Option<&str>,
    ) -> Result<Profile> {
        let profiles = raw_profiles.as_object().ok_or_else(|| {
            StrataError::Configuration(
                "profiles file must be a mapping of profile names to profiles".to_string(),
            )
        })?;

        let config = match profiles.get("config") {
            Some(Value::Object(config)) => UserConfig::from_mapping(config)?,
            Some(Value::Null) | None => UserConfig::default(),
            Some(_) => {
                return Err(StrataError::Configuration(
                    "the 'config' entry of the profiles file must be a mapping".to_string(),
                ))
            }
        };

        let raw_profile = match profiles.get(profile_name) {
            Some(raw_profile) if profile_name != "config" => raw_profile,
            _ => {
                return Err(StrataError::Configuration(format!(
                    "Could not find profile named '{}'",
                    profile_name
                )))
            }
        };

        let profile =
            Self::from_raw_profile_info(raw_profile, profile_name, renderer, target_override)?;
        Ok(profile.with_config(config))
    }

    /// Build a profile from a single raw profile entry
    ///
    /// Only the selected output is rendered. Target selection prefers
    /// `target_override` over the profile's own `target` entry.
    pub fn from_raw_profile_info(
        raw_profile: &Value,
        profile_name: &str,
        renderer: &ConfigRenderer,
        target_override: Option<&str>,
    ) -> Result<Profile> {
        let raw_profile = raw_profile.as_object().ok_or_else(|| {
            StrataError::Configuration(format!("Profile '{}' must be a mapping", profile_name))
        })?;

        let outputs = match raw_profile.get("outputs") {
            Some(Value::Object(outputs)) if !outputs.is_empty() => outputs,
            _ => {
                return Err(StrataError::Configuration(format!(
                    "Profile '{}' must declare at least one target under 'outputs'",
                    profile_name
                )))
            }
        };

        let target_name = Self::pick_target_name(raw_profile, profile_name, renderer, target_override)?;

        let raw_output = outputs.get(&target_name).ok_or_else(|| {
            let available: Vec<&str> = outputs.keys().map(String::as_str).collect();
            StrataError::Configuration(format!(
                "Target '{}' is not defined in profile '{}'; available targets: {}",
                target_name,
                profile_name,
                available.join(", ")
            ))
        })?;
        if !raw_output.is_object() {
            return Err(StrataError::Configuration(format!(
                "Target '{}' in profile '{}' must be a mapping",
                target_name, profile_name
            )));
        }

        let prefix = Keypath::from_keys(["outputs", target_name.as_str()]);
        let rendered = renderer.render_at(raw_output, &prefix, &RenderExemptions::none())?;
        let mut credentials = into_mapping(rendered)?;
        let threads = credentials.remove("threads");

        let mut mapping = Mapping::new();
        mapping.insert("profile_name".to_string(), Value::from(profile_name));
        mapping.insert("target_name".to_string(), Value::from(target_name.clone()));
        if let Some(threads) = threads {
            mapping.insert("threads".to_string(), threads);
        }
        mapping.insert("credentials".to_string(), Value::Object(credentials));

        let profile = Profile::from_mapping(&mapping)?;
        debug!(
            profile = %profile.profile_name,
            target = %profile.target_name,
            connector = %profile.connector(),
            "built profile"
        );
        Ok(profile)
    }

    fn pick_target_name(
        raw_profile: &Mapping,
        profile_name: &str,
        renderer: &ConfigRenderer,
        target_override: Option<&str>,
    ) -> Result<String> {
        if let Some(target) = target_override {
            return Ok(target.to_string());
        }

        let raw_target = raw_profile.get("target").ok_or_else(|| {
            StrataError::Configuration(format!(
                "Profile '{}' does not set a 'target' and no target was requested",
                profile_name
            ))
        })?;

        let rendered =
            renderer.render_at(raw_target, &Keypath::from_keys(["target"]), &RenderExemptions::none())?;
        match rendered {
            Value::String(name) if !name.is_empty() => Ok(name),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(StrataError::Configuration(format!(
                "Profile '{}' has an invalid target {}",
                profile_name, other
            ))),
        }
    }
}
