//! Client error types.

use crate::config::ConfigError;
use irods_protocol::scanner::{self, ErrorKind};
use irods_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A reply could not be decoded after its header was read, so the
    /// stream position is lost.
    #[error("message framing lost: {0}")]
    Framing(#[source] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("{kind}: {message} (status {code})")]
    Server {
        kind: ErrorKind,
        code: i32,
        message: String,
    },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("replica token error: {0}")]
    ReplicaToken(String),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Builds a server error from a negative status and the server's message.
    ///
    /// An empty message is replaced by the symbolic name of the code.
    pub fn from_status(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            scanner::describe(code)
        } else {
            message
        };
        ClientError::Server {
            kind: scanner::classify(code).unwrap_or(ErrorKind::Generic),
            code,
            message,
        }
    }

    /// Returns the server error kind, if this is a server error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the iRODS status code, if there is one.
    pub fn code(&self) -> Option<i32> {
        match self {
            ClientError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::Server { kind, .. } => *kind == ErrorKind::ZoneUnavailable,
            _ => false,
        }
    }

    /// Returns whether the failure leaves the socket untrustworthy.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Framing(_)
                | ClientError::ConnectionClosed
                | ClientError::Timeout
                | ClientError::TlsHandshake(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies() {
        let err = ClientError::from_status(-816000, "bad argument");
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
        assert_eq!(err.code(), Some(-816000));
        assert!(err.to_string().contains("bad argument"));
    }

    #[test]
    fn test_from_status_unknown_code() {
        let err = ClientError::from_status(-4242, "");
        assert_eq!(err.kind(), Some(ErrorKind::Generic));
        assert_eq!(err.code(), Some(-4242));
        assert!(err.to_string().contains("unknown iRODS exception code"));
    }

    #[test]
    fn test_from_status_named_fallback_message() {
        let err = ClientError::from_status(-808000, "  ");
        assert!(err.to_string().contains("CAT_NO_ROWS_FOUND"));
    }

    #[test]
    fn test_retryable_and_transport() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::ConnectionClosed.is_transport());
        assert!(!ClientError::Authentication("x".into()).is_transport());
        assert!(ClientError::Framing(ProtocolError::NegativeHeaderLength(-1)).is_transport());
        assert!(!ClientError::Protocol(ProtocolError::InvalidUtf8).is_transport());
        assert!(!ClientError::from_status(-818000, "").is_retryable());
        assert!(ClientError::from_status(-92111, "").is_retryable());
        assert_eq!(ClientError::NotConnected.code(), None);
    }
}
