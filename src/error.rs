//! Error types for trial ingestion, platform geometry and filtering.

use std::path::PathBuf;
use thiserror::Error;

/// Gallop error types
#[derive(Error, Debug)]
pub enum GallopError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("File path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Missing or malformed parameter {group}:{key}: {reason}")]
    Format {
        group: String,
        key: String,
        reason: String,
    },

    #[error("Data shape violation: {0}")]
    DataShape(String),

    #[error("Degenerate geometry on force platform {plate}: {reason}")]
    DegenerateGeometry { plate: usize, reason: String },

    #[error("Row {row} has {available} valid samples, too few for edge padding of {padding}")]
    InsufficientSamples {
        row: usize,
        available: usize,
        padding: usize,
    },

    #[error("Capture decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for gallop operations
pub type Result<T> = std::result::Result<T, GallopError>;

impl GallopError {
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn format(group: impl Into<String>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            group: group.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a parameter that is absent from its group.
    pub fn missing(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::format(group, key, "not present")
    }

    pub fn data_shape(msg: impl Into<String>) -> Self {
        Self::DataShape(msg.into())
    }

    pub fn degenerate(plate: usize, reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            plate,
            reason: reason.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
