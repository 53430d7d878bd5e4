use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token accounting; `total_tokens` is always the sum of the other two
///
/// Counts come from upstream, so the sum saturates at `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Recompute the total from its parts
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self::new(self.prompt_tokens, self.completion_tokens)
    }
}

/// Assistant message inside a choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseMessage {
    pub fn assistant(content: String) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: Some(content),
            extra: Map::new(),
        }
    }
}

/// One completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical chat completion response
///
/// Fields the gateway does not interpret are kept in `extra` so passthrough
/// providers lose nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default = "completion_object")]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn completion_object() -> String {
    "chat.completion".to_owned()
}

/// One streamed frame in canonical form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatChunk {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Value>,
}

impl ChatChunk {
    pub fn new(id: String, created: u64, model: &str, choices: Vec<Value>) -> Self {
        Self {
            id,
            object: "chat.completion.chunk",
            created,
            model: model.to_owned(),
            choices,
        }
    }

    /// Render as one SSE frame
    pub fn to_frame(&self) -> String {
        format!("data: {}\n\n", serde_json::to_string(self).unwrap_or_default())
    }
}

/// Differences between an upstream body and the canonical response shape
///
/// Used for diagnostics only; an empty list means the body conforms.
pub fn shape_issues(body: &Value) -> Vec<String> {
    let mut issues = Vec::new();

    let Some(object) = body.as_object() else {
        return vec!["response is not a JSON object".to_owned()];
    };

    for field in ["id", "model"] {
        if !object.get(field).is_some_and(Value::is_string) {
            issues.push(format!("`{field}` must be a string"));
        }
    }

    if !matches!(
        object.get("object").and_then(Value::as_str),
        Some("chat.completion" | "chat.completion.chunk")
    ) {
        issues.push("`object` must be chat.completion or chat.completion.chunk".to_owned());
    }

    if !object.get("created").is_some_and(|v| v.as_u64().is_some()) {
        issues.push("`created` must be a non-negative integer".to_owned());
    }

    match object.get("choices").and_then(Value::as_array) {
        Some(choices) => {
            for (i, choice) in choices.iter().enumerate() {
                if !choice.get("index").is_some_and(|v| v.as_u64().is_some()) {
                    issues.push(format!("`choices.{i}.index` must be a non-negative integer"));
                }
                if !choice
                    .get("finish_reason")
                    .is_some_and(|v| v.is_string() || v.is_null())
                {
                    issues.push(format!("`choices.{i}.finish_reason` must be a string or null"));
                }
            }
        }
        None => issues.push("`choices` must be an array".to_owned()),
    }

    if let Some(usage) = object.get("usage") {
        for field in ["prompt_tokens", "completion_tokens", "total_tokens"] {
            if !usage.get(field).is_some_and(|v| v.as_u64().is_some()) {
                issues.push(format!("`usage.{field}` must be a non-negative integer"));
            }
        }
    }

    issues
}
