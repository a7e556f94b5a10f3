//! Error taxonomy shared by every codec entry point.
//!
//! None of these are recovered internally; they surface to whoever drives the
//! transport so it can decide on retries or fallbacks.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Text does not match the IR grammar.
    #[error("malformed IR at JSON path {path} (line {line}, column {column}) → {message}")]
    MalformedIr {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A descriptor or type table lacks an expected section or shape.
    #[error("schema error: {0}")]
    Schema(String),

    /// The encoder needed an exemplar to pick a wire shape but got none.
    #[error("missing exemplar: cannot determine the wire shape of {0}")]
    MissingExemplar(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Record fallback reached a value that cannot enumerate its attributes.
    #[error("unsupported native type `{0}`: value does not expose its attributes")]
    UnsupportedNativeType(String),

    #[error("unrepresentable value: {0}")]
    UnrepresentableValue(String),

    #[error("application does not advertise a method named `{0}`")]
    UnknownMethod(String),
}

impl CodecError {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        CodecError::Schema(msg.into())
    }

    pub(crate) fn mismatch(msg: impl Into<String>) -> Self {
        CodecError::ShapeMismatch(msg.into())
    }
}
