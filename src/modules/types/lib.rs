//! Type definitions for Strata
//!
//! This crate contains the shared building blocks used across the Strata
//! workspace: keypaths, structural shapes for schema checks, and connector
//! types with their credential schemas.

pub mod connector;
pub mod keypath;
pub mod shape;

pub use connector::Connector;
pub use keypath::{KeySegment, Keypath};
pub use shape::{FieldSpec, ObjectSchema, SchemaViolation, Shape, TaggedSchema};
