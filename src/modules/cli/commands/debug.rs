//! Debug command implementation

use anyhow::Context;
use clap::Args;
use serde_json::Value;
use std::path::Path;
use strata_runtime::{Adapter, AdapterRegistry, Assembler};
use tracing::{debug, info};

/// Debug command arguments
#[derive(Args, Debug)]
pub struct DebugCommand {
    /// Print on a single line
    #[arg(long)]
    pub compact: bool,
}

impl DebugCommand {
    /// Execute the debug command
    pub fn execute(
        &self,
        assembler: &Assembler,
        project_dir: &Path,
        profiles_dir: &Path,
    ) -> anyhow::Result<()> {
        println!("{}", self.render(assembler, project_dir, profiles_dir)?);
        Ok(())
    }

    /// Assembled configuration as JSON text, with secret credentials masked
    pub fn render(
        &self,
        assembler: &Assembler,
        project_dir: &Path,
        profiles_dir: &Path,
    ) -> anyhow::Result<String> {
        info!("Loading project from: {}", project_dir.display());
        debug!("Using profiles from: {}", profiles_dir.display());

        let config = assembler
            .load(project_dir, profiles_dir)
            .with_context(|| format!("Failed to assemble project in '{}'", project_dir.display()))?;

        let registry = AdapterRegistry::with_builtins();
        let adapter = registry.adapter_for(&config)?;

        let mut output = config.masked_mapping()?;
        output.insert(
            "adapter".to_string(),
            serde_json::json!({
                "type": config.adapter_type(),
                "implementation": adapter.type_name(),
                "date_function": adapter.date_function(),
            }),
        );

        let output = Value::Object(output);
        let text = if self.compact {
            serde_json::to_string(&output)?
        } else {
            serde_json::to_string_pretty(&output)?
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = "\
name: my_test_project
version: '0.0.1'
profile: default
models:
  schema: \"{{ target.schema }}\"
";

    const PROFILES: &str = "\
default:
  target: dev
  outputs:
    dev:
      type: postgres
      host: localhost
      port: 5432
      user: root
      pass: hunter2
      dbname: analytics
      schema: \"{{ var('schema', 'public') }}\"
";

    fn write_files() -> (TempDir, TempDir) {
        let project_dir = TempDir::new().unwrap();
        let profiles_dir = TempDir::new().unwrap();
        std::fs::write(project_dir.path().join("project.yml"), PROJECT).unwrap();
        std::fs::write(profiles_dir.path().join("profiles.yml"), PROFILES).unwrap();
        (project_dir, profiles_dir)
    }

    #[test]
    fn test_debug_output_masks_secrets() {
        let (project_dir, profiles_dir) = write_files();
        let assembler = Assembler::new("{schema: staging}").unwrap();
        let cmd = DebugCommand { compact: true };

        let text = cmd
            .render(&assembler, project_dir.path(), profiles_dir.path())
            .unwrap();
        let output: Value = serde_json::from_str(&text).unwrap();

        assert!(!text.contains("hunter2"));
        assert_eq!(output["profile"]["credentials"]["password"], "********");
        assert_eq!(output["profile"]["credentials"]["schema"], "staging");
        assert_eq!(output["project"]["models"]["schema"], "staging");
        assert_eq!(output["adapter"]["date_function"], "now()");
    }

    #[test]
    fn test_debug_missing_project() {
        let (_, profiles_dir) = write_files();
        let empty = TempDir::new().unwrap();
        let cmd = DebugCommand { compact: false };
        let err = cmd
            .render(&Assembler::new("").unwrap(), empty.path(), profiles_dir.path())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to assemble project"));
    }
}
