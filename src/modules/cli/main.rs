//! Strata CLI
//!
//! Command-line interface for layered warehouse configuration.

use clap::Parser;
use strata_cli::{Cli, Commands};
use strata_core::StrataError;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<StrataError>() {
            Some(err) if err.is_user_error() => {
                eprintln!("Error: {:#}", e);
                std::process::exit(err.exit_code());
            }
            Some(err) => {
                eprintln!("Error: {:?}", e);
                std::process::exit(err.exit_code());
            }
            None => {
                eprintln!("Error: {:?}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    // `.env` must be loaded before any template reads the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match &cli.command {
        Commands::Debug(cmd) => {
            let assembler = cli.assembler()?;
            cmd.execute(&assembler, &cli.project_dir, &cli.profiles_dir())?;
        }
        Commands::Vars(cmd) => {
            cmd.execute(cli.vars.as_deref())?;
        }
    }

    Ok(())
}
