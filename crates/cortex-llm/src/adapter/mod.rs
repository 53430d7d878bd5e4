//! Translation between the canonical shape and each provider's wire format
//!
//! The set of adapters is closed and selected by provider, so dispatch is a
//! plain `match` rather than a trait object.

mod anthropic;
mod openai;
mod openrouter;
mod zai;

use serde_json::Value;

use crate::provider::ProviderKind;
use crate::types::{ChatRequest, ChatResponse};

/// Terminal frame of every canonical stream
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Protocol adapter for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolAdapter {
    OpenAi,
    Anthropic,
    Zai,
    OpenRouter,
}

impl ProtocolAdapter {
    pub const fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::OpenAi => Self::OpenAi,
            ProviderKind::Anthropic => Self::Anthropic,
            ProviderKind::Zai => Self::Zai,
            ProviderKind::OpenRouter => Self::OpenRouter,
        }
    }

    /// Build the upstream request body for `model`
    pub fn to_provider_request(self, request: &ChatRequest, model: &str) -> serde_json::Result<Value> {
        match self {
            Self::OpenAi => openai::to_provider_request(request, model),
            Self::Anthropic => anthropic::to_provider_request(request, model),
            Self::Zai => zai::to_provider_request(request, model),
            Self::OpenRouter => openrouter::to_provider_request(request, model),
        }
    }

    /// Convert an upstream response body into the canonical response
    pub fn to_canonical_response(self, body: Value, model: &str) -> serde_json::Result<ChatResponse> {
        match self {
            Self::OpenAi => openai::to_canonical_response(body),
            Self::Anthropic => anthropic::to_canonical_response(body, model),
            Self::Zai => zai::to_canonical_response(body, model),
            Self::OpenRouter => openrouter::to_canonical_response(body, model),
        }
    }

    /// Convert one upstream stream chunk into zero or more canonical SSE frames
    ///
    /// Chunks that cannot be parsed are returned unchanged.
    pub fn to_canonical_stream_frame(self, chunk: &str, model: &str) -> String {
        match self {
            Self::OpenAi | Self::OpenRouter => openai::to_canonical_stream_frame(chunk),
            Self::Anthropic => anthropic::to_canonical_stream_frame(chunk, model),
            Self::Zai => zai::to_canonical_stream_frame(chunk, model),
        }
    }

    /// Whether streamed bodies need per-event translation
    ///
    /// `OpenAI`-compatible streams are relayed byte for byte.
    pub const fn reframes_stream(self) -> bool {
        matches!(self, Self::Anthropic | Self::Zai)
    }
}

/// Fallback chunk id when the provider does not supply one
fn chunk_id() -> String {
    format!("chatcmpl-{}", crate::types::now_ms())
}
