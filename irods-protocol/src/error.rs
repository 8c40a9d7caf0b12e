//! Protocol-level errors.

use thiserror::Error;

/// Errors that can occur while framing or parsing protocol documents.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("header too large: {size} bytes (max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    #[error("negative header length: {0}")]
    NegativeHeaderLength(i32),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed tag document: {0}")]
    MalformedTag(String),

    #[error("missing tag: {0}")]
    MissingTag(String),

    #[error("invalid value for tag {tag}: {value:?}")]
    InvalidValue { tag: String, value: String },

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("invalid UTF-8 in message")]
    InvalidUtf8,

    #[error("password too long: {len} bytes (must be under {max})")]
    PasswordTooLong { len: usize, max: usize },

    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn missing(tag: impl Into<String>) -> Self {
        ProtocolError::MissingTag(tag.into())
    }
}
