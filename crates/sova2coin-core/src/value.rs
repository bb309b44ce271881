//! Metadata values stored in trees and flat attribute maps.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::flat::FlatMap;
use crate::tree::MetaTree;

/// Sentinel written for attributes that have no value.
pub const NOT_APPLICABLE: &str = "n/a";

/// A node of a metadata tree: a scalar leaf, a list, or a nested tree.
///
/// `NotApplicable` serializes as the string `"n/a"`. Both `"n/a"` and null
/// deserialize back into it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawValue")]
pub enum MetaValue {
    /// The "not-applicable" sentinel.
    #[default]
    NotApplicable,

    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Integer(i64),

    /// Floating point value.
    Float(f64),

    /// String value.
    String(String),

    /// Ordered sequence, addressed by stringified index when flattened.
    List(Vec<MetaValue>),

    /// Nested tree.
    Tree(MetaTree),
}

/// Wire shape used while deserializing, before the sentinel is recognized.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
    Tree(MetaTree),
}

impl From<RawValue> for MetaValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Self::NotApplicable,
            RawValue::Bool(b) => Self::Bool(b),
            RawValue::Integer(i) => Self::Integer(i),
            RawValue::Float(f) => Self::Float(f),
            RawValue::String(s) if s == NOT_APPLICABLE => Self::NotApplicable,
            RawValue::String(s) => Self::String(s),
            RawValue::List(items) => Self::List(items),
            RawValue::Tree(tree) => Self::Tree(tree),
        }
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Tree(tree) => tree.serialize(serializer),
        }
    }
}

impl MetaValue {
    /// Check if this is the not-applicable sentinel.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    /// Check if this is a leaf value (neither list nor tree).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Tree(_))
    }

    /// Check if this is a nested tree.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree(_))
    }

    /// Try to get this value as a tree.
    pub fn as_tree(&self) -> Option<&MetaTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Try to get this value as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Flatten this value into dotted keys.
    ///
    /// Lists are flattened like trees keyed by index. A scalar at the root
    /// has no path to name it by and is rejected.
    pub fn flatten(&self) -> Result<FlatMap, CoreError> {
        match self {
            Self::Tree(tree) => Ok(tree.flatten()),
            Self::List(items) => Ok(MetaTree::from_list(items).flatten()),
            scalar => Err(CoreError::NotATree {
                value: scalar.to_string(),
            }),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "{NOT_APPLICABLE}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Tree(tree) => {
                write!(f, "{{")?;
                for (i, (key, value)) in tree.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for MetaValue {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<PathBuf> for MetaValue {
    fn from(path: PathBuf) -> Self {
        Self::String(path.to_string_lossy().to_string())
    }
}

impl From<MetaTree> for MetaValue {
    fn from(tree: MetaTree) -> Self {
        Self::Tree(tree)
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotApplicable, Into::into)
    }
}
