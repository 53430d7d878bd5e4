//! Canonical OpenAI-shaped chat types shared by every provider
//!
//! Requests are accepted in this shape, translated per provider by the
//! adapters, and responses are translated back into it.

mod request;
mod response;

use jiff::Timestamp;

pub use request::{ChatMessage, ChatRequest, FieldIssue, VALID_ROLES};
pub use response::{ChatChunk, ChatResponse, Choice, ResponseMessage, Usage, shape_issues};

/// Current time as epoch milliseconds
pub(crate) fn now_ms() -> u64 {
    u64::try_from(Timestamp::now().as_millisecond()).unwrap_or(0)
}

/// Current time as epoch seconds
pub(crate) fn now_secs() -> u64 {
    now_ms() / 1000
}
