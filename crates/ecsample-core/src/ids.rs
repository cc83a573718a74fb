//! Identifier types for classes and sampleable entities.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Marker for an unspecified position in a class label (`1.1.1.-`).
pub const PARTIAL_MARKER: char = '-';

/// Separator between an anchor id and its augmentation variant.
pub const SYNTHETIC_SEPARATOR: char = '_';

/// Label identifying an equivalence class, e.g. an EC number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub String);

impl ClassId {
    /// Create a new class ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether every position of the label is specified.
    ///
    /// `3.1.1.4` is fully specified, `3.1.1.-` is not.
    pub fn is_fully_specified(&self) -> bool {
        !self.0.contains(PARTIAL_MARKER)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClassId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClassId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ClassId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier for a sampleable item. Doubles as the tensor store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create a new entity ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Placeholder for an augmented copy of `anchor`: `<anchor>_<variant>`.
    ///
    /// Produced when the anchor is the only member of its class. Stores are
    /// expected to hold these keys next to the original entity.
    pub fn synthetic(anchor: &EntityId, variant: u32) -> Self {
        Self(format!("{}{}{}", anchor.0, SYNTHETIC_SEPARATOR, variant))
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
