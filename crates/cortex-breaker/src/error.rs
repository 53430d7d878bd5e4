use cortex_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Circuit breaker errors
#[derive(Debug, Error)]
pub enum BreakerError {
    /// The provider's actor could not be reached
    #[error("circuit breaker unavailable: {0}")]
    Unavailable(String),

    /// Persisted records could not be read or written
    #[error("circuit breaker storage error: {0}")]
    Storage(String),
}

impl HttpError for BreakerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Unavailable(_) => "breaker_unavailable",
            Self::Storage(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Unavailable(_) => "Circuit breaker not available".to_owned(),
            Self::Storage(_) => "an internal error occurred".to_owned(),
        }
    }
}
