//! Gemelo Core - The typed composite-attribute engine
//!
//! One generic engine for schema-driven, dynamically-typed composite
//! rows and time-series readings, instantiated once per domain
//! (locations, sensor measures, model measures):
//! - Attribute and schema registries
//! - The four-partition typed value store
//! - Dynamic per-schema join construction
//! - Composite entity insert/list/delete
//! - Bulk time-series attachment and range queries
//!
//! Every operation runs against a caller-supplied connection or
//! transaction; the engine never owns transaction boundaries.

pub mod model;
pub mod query;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use gemelo_common::{Datatype, GemeloError, TypedValue};
pub use gemelo_persistence::domain::{DomainDef, LOCATIONS, MODELS, SENSORS};
