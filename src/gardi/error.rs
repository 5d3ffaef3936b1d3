//! Error kinds for the registration and login flows.
//!
//! Client errors carry a specific reason; `Unauthorized` deliberately
//! collapses unknown-user and wrong-password so the response never leaks
//! which condition occurred, and server faults collapse to a generic body.

use axum::http::StatusCode;
use thiserror::Error;

use crate::gardi::hasher::MAX_SECRET_LENGTH;
use crate::gardi::keywrap::{ITERATION_COUNT_MAX, ITERATION_COUNT_MIN};

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("invalid salt length: expected {expected} bytes, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },

    #[error(
        "iteration count {count} out of range [{ITERATION_COUNT_MIN}, {ITERATION_COUNT_MAX}]"
    )]
    IterationCountOutOfRange { count: u64 },

    #[error("invalid iv length: expected {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    #[error("wrapped key ciphertext must not be empty")]
    EmptyCiphertext,

    #[error("secret exceeds the {MAX_SECRET_LENGTH} byte limit")]
    SecretTooLong,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("unauthorized")]
    Unauthorized,

    #[error("request deadline exceeded")]
    Timeout,

    /// A stored credential hash failed to parse. Data-integrity fault, never
    /// returned for a plain password mismatch.
    #[error("stored credential hash is corrupt")]
    CorruptHash,

    #[error("storage fault")]
    Storage(#[source] anyhow::Error),
}

impl Error {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_)
            | Self::InvalidSaltLength { .. }
            | Self::IterationCountOutOfRange { .. }
            | Self::InvalidIvLength { .. }
            | Self::EmptyCiphertext
            | Self::SecretTooLong => StatusCode::BAD_REQUEST,
            Self::DuplicateUsername => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::CorruptHash | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to the client.
    ///
    /// Server faults never echo their cause: `CorruptHash` and `Storage`
    /// share one generic body, and `Timeout` only names its own category.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => "unauthorized".to_string(),
            Self::Timeout => "request timed out".to_string(),
            Self::CorruptHash | Self::Storage(_) => "internal error".to_string(),
            _ => self.to_string(),
        }
    }

    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_reason() {
        let err = Error::InvalidSaltLength {
            expected: 32,
            actual: 31,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "invalid salt length: expected 32 bytes, got 31"
        );
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        assert_eq!(
            Error::DuplicateUsername.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn server_faults_share_a_generic_body() {
        let storage = Error::Storage(anyhow::anyhow!("connection reset"));
        let corrupt = Error::CorruptHash;
        assert_eq!(storage.public_message(), corrupt.public_message());
        assert!(!storage.public_message().contains("connection reset"));
        assert!(storage.is_server_fault());
        assert!(corrupt.is_server_fault());
    }

    #[test]
    fn timeout_is_distinguishable_but_opaque() {
        let err = Error::Timeout;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), "request timed out");
    }
}
