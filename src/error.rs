//! Error types for decoding and editing model specs.

use crate::spec::FeatureRole;
use thiserror::Error;

/// Result type alias for wire and object-model operations.
pub type SpecResult<T> = std::result::Result<T, SpecError>;

#[derive(Debug, Error)]
pub enum SpecError {
    /// Malformed varint or length prefix.
    #[error("invalid varint: {0}")]
    Varint(#[from] prost::DecodeError),

    #[error("invalid field number {0}")]
    InvalidTag(u64),

    #[error("field {tag} is truncated")]
    Truncated { tag: u32 },

    #[error("field {tag} uses unsupported wire type {wire_type}")]
    UnsupportedWireType { tag: u32, wire_type: u8 },

    #[error("field {tag} has wire type {found}, expected {expected}")]
    UnexpectedWireType {
        tag: u32,
        found: &'static str,
        expected: &'static str,
    },

    #[error("field {tag} is not valid UTF-8")]
    InvalidUtf8 { tag: u32 },

    #[error("model has no {0} features")]
    NoFeatures(FeatureRole),

    #[error("model has no {role} feature at index {index}")]
    MissingFeature { role: FeatureRole, index: usize },

    #[error("feature with name {0} does not exist")]
    FeatureNotFound(String),

    #[error("feature {name} is of type {found}, not an image")]
    NotAnImage { name: String, found: String },

    #[error("invalid size range: {0}")]
    InvalidRange(String),

    #[error("unknown color space {0:?}")]
    UnknownColorSpace(String),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}
