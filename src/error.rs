//! Error types for the brick packer.

use crate::catalog::HeightClass;
use crate::types::{BrickType, GridPosition};
use thiserror::Error;

/// Result type alias using PackerError.
pub type Result<T> = std::result::Result<T, PackerError>;

/// Main error type for brick packing operations.
#[derive(Error, Debug)]
pub enum PackerError {
    /// The catalog cannot produce a 1x1 footprint for a type in play.
    /// A well-formed catalog never triggers this.
    #[error("catalog has no 1x1 entry for {brick_type} at height class {height_class}")]
    Configuration {
        brick_type: BrickType,
        height_class: HeightClass,
    },

    /// The engine attempted to consume a cell that is already owned or
    /// was already visited this pass. Programmer error, never
    /// user-triggerable.
    #[error("cell {0} is already owned or was already attempted this pass")]
    Consistency(GridPosition),

    /// The caller aborted the build. The grid is rolled back to the
    /// last fully committed layer.
    #[error("build cancelled")]
    Cancelled,

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
