//! Strata CLI
//!
//! This crate provides the command-line interface for Strata including:
//! - debug: Assemble the project and profile and print the result
//! - vars: Print parsed variable overrides

pub mod commands;

pub use commands::{Cli, Commands};
