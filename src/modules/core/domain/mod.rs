//! Domain entities for Strata configuration

mod credentials;
mod profile;
mod project;
mod runtime_config;
mod vars;

pub use credentials::{Credentials, MASK};
pub use profile::{Profile, UserConfig};
pub use project::{PackageSpec, Project};
pub use runtime_config::{RuntimeArgs, RuntimeConfig, NULL_PROFILE_DIR};
pub use vars::CliVars;
