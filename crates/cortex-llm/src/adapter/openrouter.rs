use serde_json::Value;

use crate::protocol::compat::OpenRouterRequest;
use crate::types::{ChatRequest, ChatResponse, Usage};

pub(super) fn to_provider_request(request: &ChatRequest, model: &str) -> serde_json::Result<Value> {
    serde_json::to_value(OpenRouterRequest {
        model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
        top_p: request.top_p,
    })
}

/// The aggregator may answer with a different underlying model; callers see what they asked for
pub(super) fn to_canonical_response(body: Value, model: &str) -> serde_json::Result<ChatResponse> {
    let mut response: ChatResponse = serde_json::from_value(body)?;
    model.clone_into(&mut response.model);
    response.usage = response.usage.map(Usage::normalized);
    Ok(response)
}
