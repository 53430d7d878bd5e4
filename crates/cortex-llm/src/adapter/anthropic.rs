use serde_json::{Value, json};

use super::{DONE_FRAME, chunk_id};
use crate::protocol::anthropic::{ContentBlock, Message, MessagesRequest, MessagesResponse, StreamEvent};
use crate::types::{ChatChunk, ChatRequest, ChatResponse, Choice, ResponseMessage, Usage, now_secs};

const DEFAULT_MAX_TOKENS: i64 = 4096;

/// Lift the first system message into `system` and drop every system turn
pub(super) fn to_provider_request(request: &ChatRequest, model: &str) -> serde_json::Result<Value> {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());

    let messages = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| Message {
            role: &m.role,
            content: &m.content,
        })
        .collect();

    serde_json::to_value(MessagesRequest {
        model,
        messages,
        system,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        stream: request.stream,
        top_p: request.top_p,
    })
}

pub(super) fn to_canonical_response(body: Value, model: &str) -> serde_json::Result<ChatResponse> {
    let response: MessagesResponse = serde_json::from_value(body)?;

    let content: String = response
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
        .collect();

    Ok(ChatResponse {
        id: response.id,
        object: "chat.completion".to_owned(),
        created: now_secs(),
        model: model.to_owned(),
        choices: vec![Choice {
            index: 0,
            message: Some(ResponseMessage::assistant(content)),
            finish_reason: Some(map_stop_reason(response.stop_reason.as_deref()).to_owned()),
            extra: serde_json::Map::new(),
        }],
        usage: Some(Usage::new(response.usage.input_tokens, response.usage.output_tokens)),
        extra: serde_json::Map::new(),
    })
}

fn map_stop_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("max_tokens") => "length",
        _ => "stop",
    }
}

/// Content deltas become chunks, `message_stop` ends the stream, anything else is dropped
pub(super) fn to_canonical_stream_frame(chunk: &str, model: &str) -> String {
    let Ok(event) = serde_json::from_str::<StreamEvent>(chunk) else {
        return chunk.to_owned();
    };

    match event {
        StreamEvent::ContentBlockDelta { delta, message_id } => {
            let text = delta.and_then(|d| d.text).unwrap_or_default();
            ChatChunk::new(
                message_id.unwrap_or_else(chunk_id),
                now_secs(),
                model,
                vec![json!({"index": 0, "delta": {"content": text}, "finish_reason": null})],
            )
            .to_frame()
        }
        StreamEvent::MessageStop { message_id } => {
            let finish = ChatChunk::new(
                message_id.unwrap_or_else(chunk_id),
                now_secs(),
                model,
                vec![json!({"index": 0, "delta": {}, "finish_reason": "stop"})],
            );
            format!("{}{DONE_FRAME}", finish.to_frame())
        }
        StreamEvent::Other => String::new(),
    }
}
