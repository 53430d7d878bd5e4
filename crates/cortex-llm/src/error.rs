use cortex_core::HttpError;
use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::FieldIssue;

/// Errors raised while dispatching a chat completion
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request body failed schema validation
    #[error("Invalid request")]
    InvalidRequest { issues: Vec<FieldIssue> },

    /// No direct credits and the client refuses aggregator fallback
    #[error("Payment Required: Direct credits exhausted. Fail-fast policy enabled.")]
    PaymentRequired,

    /// The provider's circuit is open
    #[error("Service temporarily unavailable")]
    CircuitOpen { provider: String, reason: String },

    /// Upstream answered with a non-success status after retries
    #[error("Provider error")]
    Provider {
        provider: String,
        status: u16,
        body: String,
        /// Status was in the retryable set, so the retry budget is spent
        exhausted: bool,
    },

    /// Upstream could not be reached
    #[error("Failed to complete request")]
    Transport { provider: String, message: String },

    /// Upstream answered 2xx with a body that is not a usable response
    #[error("Failed to complete request")]
    MalformedResponse { provider: String, message: String },

    /// Upstream accepted a streaming request but sent no body
    #[error("No response body")]
    EmptyStream { provider: String },

    /// Gateway misconfiguration or an unexpected local failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::CircuitOpen { .. } | Self::Provider { exhausted: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Transport { .. } | Self::MalformedResponse { .. } | Self::EmptyStream { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request_error",
            Self::PaymentRequired => "payment_required",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Provider { .. } => "provider_error",
            Self::Transport { .. } => "transport_error",
            Self::MalformedResponse { .. } | Self::EmptyStream { .. } => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Map<String, Value>> {
        let mut details = Map::new();

        match self {
            Self::InvalidRequest { issues } => {
                details.insert("details".to_owned(), serde_json::to_value(issues).ok()?);
            }
            Self::CircuitOpen { provider, reason } => {
                details.insert("provider".to_owned(), Value::from(provider.as_str()));
                details.insert("reason".to_owned(), Value::from(reason.as_str()));
            }
            Self::Provider {
                provider, status, body, ..
            } => {
                details.insert("provider".to_owned(), Value::from(provider.as_str()));
                details.insert("status".to_owned(), Value::from(*status));
                details.insert("details".to_owned(), Value::from(body.as_str()));
            }
            Self::Transport { provider, message } | Self::MalformedResponse { provider, message } => {
                details.insert("provider".to_owned(), Value::from(provider.as_str()));
                details.insert("details".to_owned(), Value::from(message.as_str()));
            }
            Self::EmptyStream { provider } => {
                details.insert("provider".to_owned(), Value::from(provider.as_str()));
            }
            Self::PaymentRequired | Self::Internal(_) => return None,
        }

        Some(details)
    }
}

#[cfg(test)]
mod tests {
    use cortex_core::error_body;

    use super::*;

    fn provider_error(status: u16, exhausted: bool) -> LlmError {
        LlmError::Provider {
            provider: "openrouter".to_owned(),
            status,
            body: "upstream said no".to_owned(),
            exhausted,
        }
    }

    #[test]
    fn exhausted_retryable_status_maps_to_503() {
        assert_eq!(provider_error(502, true).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn terminal_status_passes_through() {
        assert_eq!(provider_error(400, false).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(provider_error(401, false).status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn provider_body_carries_name_and_text() {
        let body = error_body(&provider_error(400, false));

        assert_eq!(body["error"]["message"], "Provider error");
        assert_eq!(body["error"]["provider"], "openrouter");
        assert_eq!(body["error"]["details"], "upstream said no");
    }

    #[test]
    fn validation_issues_are_listed() {
        let err = LlmError::InvalidRequest {
            issues: vec![FieldIssue {
                field: "messages".to_owned(),
                message: "At least one message is required".to_owned(),
            }],
        };
        let body = error_body(&err);

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"][0]["field"], "messages");
    }

    #[test]
    fn payment_required_message_is_exact() {
        let err = LlmError::PaymentRequired;
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            err.client_message(),
            "Payment Required: Direct credits exhausted. Fail-fast policy enabled."
        );
    }
}
