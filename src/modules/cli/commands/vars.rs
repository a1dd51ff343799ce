//! Vars command implementation

use clap::Args;
use strata_core::StrataError;
use strata_parser::parse_cli_vars;

/// Vars command arguments
#[derive(Args, Debug)]
pub struct VarsCommand {
    /// Print on a single line
    #[arg(long)]
    pub compact: bool,
}

impl VarsCommand {
    /// Execute the vars command
    pub fn execute(&self, vars: Option<&str>) -> Result<(), StrataError> {
        println!("{}", self.render(vars)?);
        Ok(())
    }

    /// Parsed variables as JSON text
    pub fn render(&self, vars: Option<&str>) -> Result<String, StrataError> {
        let vars = parse_cli_vars(vars.unwrap_or_default())?;
        let text = if self.compact {
            serde_json::to_string(&vars)?
        } else {
            serde_json::to_string_pretty(&vars)?
        };
        Ok(text)
    }
}
