//! Gemelo Persistence - Physical table layout for the typed
//! composite-attribute store
//!
//! This crate provides:
//! - Per-domain table identifiers derived from a table-name prefix
//! - DDL builders for the composite and readings table patterns
//! - Low-level statement helpers shared by the service layer

pub mod ddl;
pub mod domain;
pub mod sql;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export the domain definitions
pub use domain::{DomainDef, LOCATIONS, MODELS, SENSORS};
