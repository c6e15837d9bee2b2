//! Error types for coordinate handling.

use thiserror::Error;

/// Errors raised when coordinates are constructed or parsed from raw values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Cube coordinates whose components do not sum to zero
    #[error("cube coordinates must sum to zero, got ({q}, {r}, {s})")]
    InvalidCube {
        /// Q component
        q: i32,
        /// R component
        r: i32,
        /// S component
        s: i32,
    },

    /// A local tile key that is not of the form `"col,row"`
    #[error("invalid local tile key {0:?}, expected \"col,row\"")]
    InvalidLocalKey(String),

    /// A schema version string that is not `major.minor[.patch]`
    #[error("invalid schema version {0:?}")]
    InvalidVersion(String),
}

/// Result type alias for coordinate operations.
pub type CoordResult<T> = Result<T, CoordError>;
