//! Runtime configuration for Strata
//!
//! This crate assembles runtime configurations from built or raw project and
//! profile parts, and keeps the registry of warehouse adapters that a
//! configuration is executed through.

pub mod adapters;
pub mod assemble;
pub mod testing;

pub use adapters::{Adapter, AdapterRegistry, SqlAdapter};
pub use assemble::{Assembler, ConfigPart};
