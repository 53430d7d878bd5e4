use serde_json::{Map, Value, json};

use super::{DONE_FRAME, chunk_id};
use crate::protocol::compat::ZaiRequest;
use crate::types::{ChatChunk, ChatRequest, ChatResponse, Choice, ResponseMessage, Usage, now_secs};

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: i64 = 4096;

pub(super) fn to_provider_request(request: &ChatRequest, model: &str) -> serde_json::Result<Value> {
    serde_json::to_value(ZaiRequest {
        model,
        messages: &request.messages,
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        top_p: request.top_p,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream: request.stream,
    })
}

/// Rebuild the response from known fields under the requested model name
pub(super) fn to_canonical_response(body: Value, model: &str) -> serde_json::Result<ChatResponse> {
    let upstream: ChatResponse = serde_json::from_value(body)?;

    let choices = upstream
        .choices
        .into_iter()
        .map(|choice| Choice {
            index: choice.index,
            message: choice.message.map(|m| ResponseMessage {
                role: m.role,
                content: m.content,
                extra: Map::new(),
            }),
            finish_reason: choice.finish_reason,
            extra: Map::new(),
        })
        .collect();

    Ok(ChatResponse {
        id: upstream.id,
        object: "chat.completion".to_owned(),
        created: upstream.created,
        model: model.to_owned(),
        choices,
        usage: upstream.usage.map(Usage::normalized),
        extra: Map::new(),
    })
}

/// GLM chunks are already chat chunks; only id, timestamp and model are normalized
pub(super) fn to_canonical_stream_frame(chunk: &str, model: &str) -> String {
    if chunk.trim() == "[DONE]" {
        return DONE_FRAME.to_owned();
    }

    let Ok(event) = serde_json::from_str::<Value>(chunk) else {
        return chunk.to_owned();
    };

    let id = event
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(chunk_id, str::to_owned);

    let created = event.get("created").and_then(Value::as_u64).unwrap_or_else(now_secs);

    let choices = match event.get("choices").and_then(Value::as_array) {
        Some(choices) => choices.clone(),
        None => vec![json!({
            "index": 0,
            "delta": event.get("delta").cloned().unwrap_or_else(|| json!({})),
            "finish_reason": event.get("finish_reason").cloned().unwrap_or(Value::Null),
        })],
    };

    ChatChunk::new(id, created, model, choices).to_frame()
}
