//! Error types for ecsample.

use crate::{ClassId, EntityId};
use thiserror::Error;

/// Errors that can occur while mining or sampling.
#[derive(Error, Debug)]
pub enum Error {
    /// Every distance in a class's row is zero, so no negative exists.
    #[error("Degenerate distances: class {class} has no non-zero distance to any other class")]
    DegenerateDistance { class: ClassId },

    /// A sampled class was not part of the mined class universe.
    #[error("No mining entry for class {class}")]
    MissingMiningEntry { class: ClassId },

    /// Tensor store has nothing under this key.
    #[error("Resource not found: {key}")]
    MissingResource { key: EntityId },

    /// Key cannot name a file under a store root.
    #[error("Invalid resource key: {key:?}")]
    InvalidKey { key: EntityId },

    /// A bounded rejection loop ran out of attempts.
    #[error("No acceptable candidate for {anchor} after {attempts} attempts")]
    ExhaustedCandidates { anchor: EntityId, attempts: usize },

    /// Entity has no class list.
    #[error("Entity not found: {0}")]
    UnknownEntity(EntityId),

    /// Class has no members.
    #[error("Class has no members: {0}")]
    UnknownClass(ClassId),

    /// Distance is negative, NaN or infinite.
    #[error("Invalid distance {distance} between {from} and {to}")]
    InvalidDistance {
        from: ClassId,
        to: ClassId,
        distance: f64,
    },

    /// Shortlist candidates and weights disagree.
    #[error("Malformed shortlist for class {class}: {reason}")]
    MalformedShortlist { class: ClassId, reason: String },

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset index past the end.
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Stored record lacks the requested representation layer.
    #[error("Representation layer {layer} missing for {key}")]
    MissingLayer { key: EntityId, layer: u32 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Annotation table error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary serialization error.
    #[cfg(feature = "binary")]
    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Result type alias for ecsample.
pub type Result<T> = std::result::Result<T, Error>;
