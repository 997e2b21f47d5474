use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while converting between host values and wire values.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported host value type: {type_name}")]
    #[diagnostic(code("CODEC-ENC-001"))]
    UnsupportedType { type_name: String },

    #[error("Invalid input: {0}")]
    #[diagnostic(
        code("CODEC-ARGS-001"),
        help("Arguments are built from a map of names to values")
    )]
    InvalidInput(String),

    #[error("Malformed wire value: {0}")]
    #[diagnostic(code("CODEC-DEC-001"))]
    MalformedWireValue(String),

    #[error("Text contains an interior NUL byte at offset {offset}")]
    #[diagnostic(code("CODEC-ENC-002"), help("C strings cannot carry NUL bytes"))]
    InteriorNul { offset: usize },

    #[error("Collection of {len} elements does not fit the wire length field")]
    #[diagnostic(code("CODEC-ENC-003"))]
    TooLarge { len: usize },
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CodecError::MalformedWireValue(reason.into())
    }

    pub(crate) fn unsupported(type_name: impl Into<String>) -> Self {
        CodecError::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
