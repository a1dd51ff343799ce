//! Core domain logic for Strata
//!
//! This crate contains the configuration entities (profile, project, merged
//! runtime configuration), the mapping round-trip contract they implement,
//! and the error types shared by the workspace.

pub mod contract;
pub mod domain;
pub mod error;

pub use contract::{into_mapping, Contract, Mapping};
pub use domain::*;
pub use error::{Result, StrataError};
