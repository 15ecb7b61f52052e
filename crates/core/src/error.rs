//! Error types for the geometry layer
//!
//! The geometry layer has a single fallible surface: parsing bytes into
//! an [`Object`](crate::Object). Every other operation (bounds, weight,
//! predicates, encoding) is infallible by construction.

use thiserror::Error;

/// Result type alias for geometry-layer operations
pub type Result<T> = std::result::Result<T, GeomError>;

/// Errors produced while parsing GeoJSON input
#[derive(Debug, Error)]
pub enum GeomError {
    /// The input was empty
    #[error("empty input")]
    EmptyInput,

    /// The input looked like JSON but failed to parse
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The `type` member is missing or not a string
    #[error("missing or invalid type member")]
    MissingType,

    /// The `type` member names a type this layer does not know
    #[error("unknown geojson type {0:?}")]
    UnknownType(String),

    /// A required member is missing or has the wrong shape
    #[error("invalid {member} member for {kind}")]
    InvalidMember {
        /// The object type being parsed
        kind: &'static str,
        /// The offending member name
        member: &'static str,
    },

    /// A coordinate position is not an array of 2 or 3 numbers
    #[error("invalid position in {kind}")]
    InvalidPosition {
        /// The object type being parsed
        kind: &'static str,
    },
}

impl GeomError {
    /// Shorthand for an invalid-member error
    pub(crate) fn member(kind: &'static str, member: &'static str) -> Self {
        GeomError::InvalidMember { kind, member }
    }
}
