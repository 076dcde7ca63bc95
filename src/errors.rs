//! Typed error hierarchy for repolens.
//!
//! `ReviewError` covers every failure the library can surface. Per-file
//! fetch/analyze failures are caught by the orchestrator and recorded on the
//! file's report; everything else propagates to the caller as a single
//! terminal failure for that operation.

use thiserror::Error;

/// Errors from the credential, forge, analyzer and orchestrator subsystems.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Bad, missing or revoked token.
    #[error("{0}")]
    Auth(String),

    /// Repository, branch or file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// File content is not text-decodable.
    #[error("{0}")]
    Decode(String),

    /// Malformed or rejected analyzer response.
    #[error("{0}")]
    Analysis(String),

    /// Issue-creation payload rejected by the forge.
    #[error("{0}")]
    Validation(String),

    /// OAuth state mismatch.
    #[error("OAuth state mismatch - possible security issue")]
    Security,

    /// Missing analyzer key or OAuth app credentials.
    #[error("{0}")]
    Config(String),

    /// Transport failure or an unexpected HTTP status.
    #[error("{0}")]
    Http(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stable tag for a [`ReviewError`] variant, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    NotFound,
    Decode,
    Analysis,
    Validation,
    Security,
    Config,
    Http,
    Io,
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Analysis(_) => ErrorKind::Analysis,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Security => ErrorKind::Security,
            Self::Config(_) => ErrorKind::Config,
            Self::Http(_) => ErrorKind::Http,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(format!("Failed to decode response: {}", err))
        } else {
            Self::Http(format!("Request failed: {}", err))
        }
    }
}

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_error_has_fixed_message() {
        let err = ReviewError::Security;
        assert_eq!(err.kind(), ErrorKind::Security);
        assert!(err.to_string().contains("state mismatch"));
    }

    #[test]
    fn not_found_keeps_message_verbatim() {
        let err = ReviewError::NotFound("GitHub API Error: 404 Not Found".into());
        assert_eq!(err.to_string(), "GitHub API Error: 404 Not Found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: ReviewError = io_err.into();
        match &err {
            ReviewError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::AddrInUse),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn kinds_are_distinct() {
        let auth = ReviewError::Auth("x".into());
        let config = ReviewError::Config("x".into());
        assert_ne!(auth.kind(), config.kind());
        assert!(matches!(auth, ReviewError::Auth(_)));
        assert!(!matches!(config, ReviewError::Auth(_)));
    }

    #[test]
    fn implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ReviewError::Validation("labels".into()));
    }
}
