//! CLI commands

mod debug;
mod vars;

pub use debug::DebugCommand;
pub use vars::VarsCommand;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strata_core::StrataError;
use strata_runtime::Assembler;

/// Environment variable that overrides the default profiles directory
pub const PROFILES_DIR_ENV: &str = "STRATA_PROFILES_DIR";

/// Strata - Layered configuration assembly for warehouse projects
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing `project.yml` (and optionally `packages.yml`)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Directory containing `profiles.yml`
    ///
    /// Defaults to `$STRATA_PROFILES_DIR`, then `~/.strata`.
    #[arg(long, global = true)]
    pub profiles_dir: Option<PathBuf>,

    /// Variable overrides as a YAML mapping, e.g. `{schema: dev, limit: 10}`
    #[arg(long, global = true)]
    pub vars: Option<String>,

    /// Target to use instead of the profile's default
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the assembled runtime configuration with secrets masked
    Debug(DebugCommand),

    /// Print the parsed variable overrides
    Vars(VarsCommand),
}

impl Cli {
    /// Effective profiles directory
    pub fn profiles_dir(&self) -> PathBuf {
        if let Some(dir) = &self.profiles_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(PROFILES_DIR_ENV) {
            return PathBuf::from(dir);
        }
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".strata"),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Assembler configured from the global flags
    pub fn assembler(&self) -> Result<Assembler, StrataError> {
        let assembler = Assembler::new(self.vars.clone().unwrap_or_default())?
            .with_profile_dir(self.profiles_dir());
        Ok(match &self.target {
            Some(target) => assembler.with_target(target.clone()),
            None => assembler,
        })
    }
}
