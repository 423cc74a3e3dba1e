//! Unified client error taxonomy.
//!
//! Every error carries a stable numeric discriminator via [`Error::status`]
//! so callers branch without string-matching messages. Crypto failures of
//! any kind collapse into `IncorrectEncryptionKey` — cryptographic
//! diagnostics never leak past this crate.

use thiserror::Error;

use kl_crypto::CryptoError;
use kl_proto::membership::TransitionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Incorrect encryption key")]
    IncorrectEncryptionKey,

    #[error("Too many requests")]
    TooManyRequests,

    /// Catch-all. Displays generically; the cause is kept for diagnostics.
    #[error("Internal error")]
    Internal {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Stable status-code-like discriminator.
    pub fn status(&self) -> u16 {
        match self {
            Error::BadRequest(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::IncorrectEncryptionKey => 409,
            Error::TooManyRequests => 429,
            Error::Internal { .. } => 500,
        }
    }

    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Internal { source: Box::new(source) }
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        // The cause is logged, never surfaced.
        tracing::debug!(cause = %err, "crypto failure normalised");
        Error::IncorrectEncryptionKey
    }
}

impl From<TransitionError> for Error {
    fn from(err: TransitionError) -> Self {
        Error::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_collapse_to_incorrect_key() {
        let err: Error = CryptoError::AeadDecrypt.into();
        assert!(matches!(err, Error::IncorrectEncryptionKey));
        let err: Error = CryptoError::KeyUnwrap.into();
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn internal_error_displays_generically() {
        let err = Error::internal(std::io::Error::new(std::io::ErrorKind::Other, "secret detail"));
        assert_eq!(err.to_string(), "Internal error");
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn statuses_are_distinct_per_condition() {
        assert_eq!(Error::BadRequest("x".into()).status(), 400);
        assert_eq!(Error::Unauthorized("x".into()).status(), 401);
        assert_eq!(Error::Forbidden("x".into()).status(), 403);
        assert_eq!(Error::NotFound("x".into()).status(), 404);
        assert_eq!(Error::TooManyRequests.status(), 429);
    }
}
