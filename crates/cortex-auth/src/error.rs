use cortex_core::HttpError;
use http::StatusCode;

/// Authentication and authorization errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer token on the request
    #[error("Unauthorized: Missing API key")]
    MissingKey,

    /// Bearer token is not known to the directory
    #[error("Invalid API Key")]
    InvalidKey,

    /// Authenticated client is not an administrator
    #[error("Forbidden: Admin access required")]
    Forbidden,

    /// Directory request failed in transport
    #[error("client directory unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// Directory answered with an unexpected response
    #[error("client directory error ({status}): {message}")]
    Directory {
        /// HTTP status code
        status: u16,
        /// Error message from the directory
        message: String,
    },
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingKey | Self::InvalidKey => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unreachable(_) | Self::Directory { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::MissingKey | Self::InvalidKey => "authentication_error",
            Self::Forbidden => "permission_error",
            Self::Unreachable(_) | Self::Directory { .. } => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Unreachable(_) | Self::Directory { .. } => "client lookup failed".to_owned(),
            other => other.to_string(),
        }
    }
}
