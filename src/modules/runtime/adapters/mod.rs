//! Warehouse adapters for Strata
//!
//! This module provides the adapter trait, the built-in SQL dialect
//! adapters, and the registry that maps connector type keys to adapters.

mod registry;
mod sql;
mod traits;

pub use registry::AdapterRegistry;
pub use sql::SqlAdapter;
pub use traits::Adapter;
