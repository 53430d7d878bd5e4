//! Streaming pass-through from an upstream SSE body to the client

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};

use crate::adapter::ProtocolAdapter;
use crate::error::LlmError;
use crate::provider::ProviderKind;

/// Wrap an upstream streaming response as a client SSE response
///
/// `OpenAI`-compatible bodies are forwarded byte for byte. Other providers
/// are parsed event by event and re-emitted as canonical chunks; events
/// that translate to nothing are dropped.
pub fn relay(
    upstream: reqwest::Response,
    provider: ProviderKind,
    model: String,
) -> Result<Response, LlmError> {
    if upstream.content_length() == Some(0) {
        return Err(LlmError::EmptyStream {
            provider: provider.to_string(),
        });
    }

    let adapter = ProtocolAdapter::for_provider(provider);

    let body = if adapter.reframes_stream() {
        let frames = upstream.bytes_stream().eventsource().filter_map(move |event| {
            let frame = match event {
                Ok(event) => {
                    let frame = adapter.to_canonical_stream_frame(&event.data, &model);
                    (!frame.is_empty()).then_some(Ok::<_, std::io::Error>(frame))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream interrupted");
                    Some(Err(std::io::Error::other(e.to_string())))
                }
            };
            std::future::ready(frame)
        });
        Body::from_stream(frames)
    } else {
        Body::from_stream(upstream.bytes_stream())
    };

    Ok(sse_response(body))
}

fn sse_response(body: Body) -> Response {
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
        (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        (CONNECTION, HeaderValue::from_static("keep-alive")),
        (HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")),
    ];

    (StatusCode::OK, headers, body).into_response()
}
