use std::fmt;

use cortex_core::HttpError;
use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Which per-minute ceiling was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Requests,
    Tokens,
}

impl LimitKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Tokens => "tokens",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Client is at or above one of its ceilings for the current minute
    #[error("Rate limit exceeded")]
    Exceeded {
        /// Ceiling that was hit
        kind: LimitKind,
        /// Configured ceiling
        limit: u64,
    },

    /// Usage store could not be read or written
    #[error("usage store error: {0}")]
    Storage(String),
}

impl HttpError for RateLimitError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Exceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Exceeded { kind, .. } => kind.as_str(),
            Self::Storage(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Exceeded { .. } => self.to_string(),
            Self::Storage(_) => "an internal error occurred".to_owned(),
        }
    }

    fn details(&self) -> Option<Map<String, Value>> {
        let Self::Exceeded { limit, .. } = self else {
            return None;
        };

        let mut details = Map::new();
        details.insert("limit".to_owned(), Value::from(*limit));
        Some(details)
    }
}
