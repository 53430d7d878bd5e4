//! Request bodies for OpenAI-compatible aggregators
//!
//! Z.ai and `OpenRouter` both speak the chat completions format but get an
//! explicit field list instead of the raw canonical body.

use serde::Serialize;

use crate::types::ChatMessage;

/// Z.ai requires sampling defaults to be spelled out
#[derive(Debug, Serialize)]
pub struct ZaiRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    pub max_tokens: i64,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenRouterRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}
