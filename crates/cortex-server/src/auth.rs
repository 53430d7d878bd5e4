use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use cortex_auth::{AuthError, ClientDirectory, ClientPolicy};
use cortex_core::{HttpError, error_body};

/// The bearer token a request was authenticated with
#[derive(Debug, Clone)]
pub struct ApiKey(pub String);

/// Resolve the bearer token to a client policy
///
/// On success the policy and the key are attached as request extensions.
pub async fn authenticate(
    State(directory): State<Arc<dyn ClientDirectory>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(api_key) = bearer_token(&request) else {
        return auth_error(&AuthError::MissingKey);
    };

    let policy = match directory.get(&api_key).await {
        Ok(Some(policy)) => policy,
        Ok(None) => return auth_error(&AuthError::InvalidKey),
        Err(e) => {
            tracing::error!(error = %e, "client lookup failed");
            return auth_error(&e);
        }
    };

    tracing::debug!(app_id = %policy.app_id, "client authenticated");

    request.extensions_mut().insert(policy);
    request.extensions_mut().insert(ApiKey(api_key));
    next.run(request).await
}

/// Reject authenticated clients without the admin flag
///
/// Must run inside [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<Arc<ClientPolicy>>()
        .is_some_and(|policy| policy.admin);

    if !is_admin {
        return auth_error(&AuthError::Forbidden);
    }

    next.run(request).await
}

/// Token from `Authorization`, with or without the `Bearer ` prefix
fn bearer_token(request: &Request) -> Option<String> {
    let value = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_owned())
}

fn auth_error(error: &AuthError) -> Response {
    (error.status_code(), Json(error_body(error))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use cortex_auth::{FallbackStrategy, RateLimitPolicy, StaticDirectory};
    use http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    fn policy(admin: bool) -> ClientPolicy {
        ClientPolicy {
            app_id: "kinisi".to_owned(),
            name: "Kinisi".to_owned(),
            default_model: None,
            allow_zai: true,
            fallback_strategy: FallbackStrategy::Openrouter,
            rate_limit: RateLimitPolicy::default(),
            admin,
        }
    }

    fn app() -> Router {
        let directory: Arc<dyn ClientDirectory> = Arc::new(StaticDirectory::from_policies([
            ("sk-client".to_owned(), policy(false)),
            ("sk-admin".to_owned(), policy(true)),
        ]));

        let admin = Router::new()
            .route("/admin", get(|| async { "admin" }))
            .layer(middleware::from_fn(require_admin));

        Router::new()
            .route(
                "/whoami",
                get(|Extension(key): Extension<ApiKey>| async move { key.0 }),
            )
            .merge(admin)
            .layer(middleware::from_fn_with_state(directory, authenticate))
    }

    async fn call(path: &str, authorization: Option<&str>) -> (StatusCode, String) {
        let mut request = http::Request::get(path);
        if let Some(value) = authorization {
            request = request.header("authorization", value);
        }

        let response = app().oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_key_is_401() {
        let (status, body) = call("/whoami", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Unauthorized: Missing API key"));
    }

    #[tokio::test]
    async fn unknown_key_is_401() {
        let (status, body) = call("/whoami", Some("Bearer sk-nope")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn known_key_reaches_handler() {
        let (status, body) = call("/whoami", Some("Bearer sk-client")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sk-client");
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_on_admin_routes() {
        let (status, body) = call("/admin", Some("Bearer sk-client")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("Forbidden: Admin access required"));
    }

    #[tokio::test]
    async fn admin_passes() {
        let (status, body) = call("/admin", Some("Bearer sk-admin")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }
}
