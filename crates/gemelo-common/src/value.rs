//! Primitive datatype tags and the dynamically-typed value union
//!
//! Every attribute an identifier declares is one of four primitive
//! datatypes; every stored value is the matching `TypedValue` variant.
//! Dispatch over the closed set is an exhaustive match everywhere, so an
//! unknown datatype can only appear at the parse boundary.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::GemeloError;

/// The closed set of primitive datatypes an attribute can declare
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    String,
    Integer,
    Float,
    Boolean,
}

impl Datatype {
    /// All partitions, in table-layout order
    pub const ALL: [Datatype; 4] = [
        Datatype::String,
        Datatype::Integer,
        Datatype::Float,
        Datatype::Boolean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Integer => "integer",
            Datatype::Float => "float",
            Datatype::Boolean => "boolean",
        }
    }
}

impl Display for Datatype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Datatype {
    type Err = GemeloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Datatype::String),
            "integer" => Ok(Datatype::Integer),
            "float" => Ok(Datatype::Float),
            "boolean" => Ok(Datatype::Boolean),
            other => Err(GemeloError::InvalidDatatype(other.to_string())),
        }
    }
}

/// One dynamically-typed attribute value
///
/// Serialized untagged so composite records render as flat JSON objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl TypedValue {
    /// The partition tag matching this value's runtime variant
    pub fn datatype(&self) -> Datatype {
        match self {
            TypedValue::String(_) => Datatype::String,
            TypedValue::Integer(_) => Datatype::Integer,
            TypedValue::Float(_) => Datatype::Float,
            TypedValue::Boolean(_) => Datatype::Boolean,
        }
    }
}

impl Display for TypedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::String(v) => write!(f, "{v}"),
            TypedValue::Integer(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{v}"),
            TypedValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Integer(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Float(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}
