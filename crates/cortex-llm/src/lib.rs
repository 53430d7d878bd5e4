//! Chat completion dispatch for Cortex
//!
//! Accepts `OpenAI`-shaped requests, routes them to Z.ai, Anthropic, `OpenAI`
//! or `OpenRouter`, retries transient failures, consults the per-provider
//! circuit breakers and translates responses and streams back into the
//! canonical shape.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod adapter;
pub mod error;
mod handler;
pub mod protocol;
pub mod provider;
pub mod relay;
pub mod retry;
pub mod router;
mod state;
pub mod types;

pub use adapter::ProtocolAdapter;
pub use error::LlmError;
pub use handler::{CATALOG, CatalogModel, chat_router, llm_router, models_router};
pub use provider::ProviderKind;
pub use retry::RetryPolicy;
pub use router::{ProviderRoute, ProviderRouter, select_provider};
pub use state::{DEFAULT_MODEL, LlmState};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Usage};
