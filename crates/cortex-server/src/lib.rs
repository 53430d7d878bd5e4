#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! HTTP surface of the gateway
//!
//! Public routes answer without credentials. Everything else needs a known
//! API key. The chat route is also metered per minute, and operator routes
//! require an admin client.

mod admin;
mod analytics;
mod auth;
mod cors;
mod health;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use cortex_auth::ClientDirectory;
use cortex_breaker::BreakerArena;
use cortex_config::{Config, default_langfuse_url};
use cortex_llm::LlmState;
use cortex_ratelimit::UsageLimiter;
use jiff::Timestamp;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use url::Url;

pub use auth::ApiKey;

const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8787);

/// Current wall-clock time in epoch milliseconds
pub(crate) fn now_ms() -> u64 {
    u64::try_from(Timestamp::now().as_millisecond()).unwrap_or_default()
}

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

/// Shared state the routes are built from
struct Components {
    directory: Arc<dyn ClientDirectory>,
    limiter: UsageLimiter,
    breakers: Option<BreakerArena>,
    llm: LlmState,
    langfuse_url: Url,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the client directory, usage store, breaker
    /// store, telemetry sink or provider table cannot be set up
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address.unwrap_or(DEFAULT_LISTEN);

        let directory = cortex_auth::build_directory(&config)?;
        let limiter = cortex_ratelimit::create_limiter(&config.rate_limit)?;
        let breakers = cortex_breaker::start(&config.circuit_breaker).await?;
        let sink = cortex_telemetry::build_sink(config.telemetry.as_ref())?;
        let llm = LlmState::new(&config, breakers.clone(), sink)?;

        let langfuse_url = config
            .telemetry
            .as_ref()
            .and_then(|telemetry| telemetry.langfuse.as_ref())
            .map_or_else(default_langfuse_url, |langfuse| langfuse.base_url.clone());

        let components = Components {
            directory,
            limiter,
            breakers,
            llm,
            langfuse_url,
        };

        let cors = config.server.cors.clone().unwrap_or_default();

        let router = build_router(components)
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.server.request_timeout))
            .layer(cors::cors_layer(&cors));

        Ok(Self { router, listen_address })
    }

    /// Get the configured listen address
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

fn build_router(components: Components) -> Router {
    let Components {
        directory,
        limiter,
        breakers,
        llm,
        langfuse_url,
    } = components;

    let public = Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler));

    let client = cortex_llm::chat_router(llm)
        .layer(from_fn_with_state(limiter.clone(), rate_limit::enforce))
        .merge(cortex_llm::models_router())
        .layer(from_fn_with_state(Arc::clone(&directory), auth::authenticate));

    let breaker_routes = Router::new()
        .route("/health/providers", get(health::providers_handler))
        .route("/health/reset/{provider}", post(health::reset_handler))
        .with_state(breakers);

    let operator = breaker_routes
        .merge(admin::admin_router(admin::AdminState {
            directory: Arc::clone(&directory),
            limiter,
        }))
        .merge(analytics::analytics_router(langfuse_url))
        .layer(from_fn(auth::require_admin))
        .layer(from_fn_with_state(directory, auth::authenticate));

    public.merge(client).merge(operator)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::StatusCode;
    use tower::ServiceExt;

    use super::*;

    const CONFIG: &str = r#"
[directory]
type = "static"

[directory.clients."sk-app"]
app_id = "kinisi"
name = "Kinisi"

[directory.clients."sk-ops"]
app_id = "ops"
name = "Operations"
admin = true
"#;

    async fn router() -> Router {
        let config = Config::from_toml(CONFIG).unwrap();
        Server::new(config).await.unwrap().into_router()
    }

    async fn status(request: http::Request<Body>) -> StatusCode {
        router().await.oneshot(request).await.unwrap().status()
    }

    fn get(uri: &str, key: Option<&str>) -> http::Request<Body> {
        let mut builder = http::Request::get(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn default_listen_address() {
        let server = Server::new(Config::default()).await.unwrap();
        assert_eq!(server.listen_address().port(), 8787);
    }

    #[tokio::test]
    async fn public_routes_need_no_key() {
        assert_eq!(status(get("/", None)).await, StatusCode::OK);
        assert_eq!(status(get("/health", None)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn client_routes_need_a_known_key() {
        assert_eq!(status(get("/v1/models", None)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(get("/v1/models", Some("sk-nope"))).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(get("/v1/models", Some("sk-app"))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn operator_routes_need_admin() {
        assert_eq!(status(get("/admin/clients", None)).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(get("/admin/clients", Some("sk-app"))).await, StatusCode::FORBIDDEN);
        assert_eq!(status(get("/admin/clients", Some("sk-ops"))).await, StatusCode::OK);
        assert_eq!(status(get("/health/providers", Some("sk-ops"))).await, StatusCode::OK);
        assert_eq!(status(get("/analytics/metrics", Some("sk-app"))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let request = http::Request::builder()
            .method("OPTIONS")
            .uri("/v1/chat/completions")
            .header("origin", "https://app.example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = router().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
