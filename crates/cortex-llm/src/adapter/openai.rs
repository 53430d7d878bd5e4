use serde_json::Value;

use crate::types::{ChatRequest, ChatResponse};

pub(super) fn to_provider_request(request: &ChatRequest, model: &str) -> serde_json::Result<Value> {
    let mut body = request.clone();
    body.model = Some(model.to_owned());
    serde_json::to_value(body)
}

pub(super) fn to_canonical_response(body: Value) -> serde_json::Result<ChatResponse> {
    let mut response: ChatResponse = serde_json::from_value(body)?;
    response.usage = response.usage.map(crate::types::Usage::normalized);
    Ok(response)
}

/// Frames from `OpenAI`-compatible providers only need SSE termination fixed up
pub(super) fn to_canonical_stream_frame(chunk: &str) -> String {
    if chunk.starts_with("data: ") {
        format!("{chunk}\n")
    } else {
        format!("data: {chunk}\n\n")
    }
}
