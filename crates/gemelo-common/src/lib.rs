//! Gemelo Common - Shared types for the Gemelo digital-twin platform
//!
//! This crate provides the foundational types used across all Gemelo
//! components:
//! - Error types shared by every service
//! - The closed `Datatype`/`TypedValue` primitive unions

pub mod error;
pub mod value;

// Re-exports for convenience
pub use error::GemeloError;
pub use value::{Datatype, TypedValue};
