use serde::{Deserialize, Serialize};

/// Roles accepted in a canonical request
pub const VALID_ROLES: [&str; 3] = ["system", "user", "assistant"];

/// Canonical chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Requested model; the client's default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A single validation failure, reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ChatRequest {
    /// Parse a request body, reporting malformed JSON as a single issue on `body`
    pub fn from_slice(body: &[u8]) -> Result<Self, Vec<FieldIssue>> {
        serde_json::from_slice(body).map_err(|e| vec![FieldIssue::new("body", e.to_string())])
    }

    /// Check every field, collecting all issues rather than stopping at the first
    pub fn validate(&self) -> Result<(), Vec<FieldIssue>> {
        let mut issues = Vec::new();

        if self.messages.is_empty() {
            issues.push(FieldIssue::new("messages", "At least one message is required"));
        }

        for (i, message) in self.messages.iter().enumerate() {
            if !VALID_ROLES.contains(&message.role.as_str()) {
                issues.push(FieldIssue::new(
                    format!("messages.{i}.role"),
                    format!(
                        "Invalid role '{}', expected one of {}",
                        message.role,
                        VALID_ROLES.join(", ")
                    ),
                ));
            }
            if message.content.is_empty() {
                issues.push(FieldIssue::new(
                    format!("messages.{i}.content"),
                    "Message content cannot be empty",
                ));
            }
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            issues.push(FieldIssue::new("temperature", "Must be between 0 and 2"));
        }

        if let Some(top_p) = self.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            issues.push(FieldIssue::new("top_p", "Must be between 0 and 1"));
        }

        if self.max_tokens.is_some_and(|max| max <= 0) {
            issues.push(FieldIssue::new("max_tokens", "Must be a positive integer"));
        }

        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }

    /// Message contents in order, for token estimation
    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: None,
            messages,
            temperature: None,
            max_tokens: None,
            top_p: None,
            stream: false,
        }
    }

    #[test]
    fn minimal_body_parses_with_defaults() {
        let req = ChatRequest::from_slice(br#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();

        assert_eq!(req.model, None);
        assert!(!req.stream);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_body_issue() {
        let issues = ChatRequest::from_slice(b"{not json").unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "body");
    }

    #[test]
    fn empty_messages_are_rejected() {
        let issues = request(vec![]).validate().unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("messages", "At least one message is required")]);
    }

    #[test]
    fn all_message_issues_are_collected() {
        let issues = request(vec![
            ChatMessage::new("tool", "result"),
            ChatMessage::new("user", ""),
        ])
        .validate()
        .unwrap_err();

        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["messages.0.role", "messages.1.content"]);
    }

    #[test]
    fn sampling_bounds_are_enforced() {
        let mut req = request(vec![ChatMessage::new("user", "hi")]);
        req.temperature = Some(2.5);
        req.top_p = Some(-0.1);
        req.max_tokens = Some(0);

        let fields: Vec<String> = req.validate().unwrap_err().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["temperature", "top_p", "max_tokens"]);

        req.temperature = Some(2.0);
        req.top_p = Some(1.0);
        req.max_tokens = Some(1);
        assert!(req.validate().is_ok());
    }
}
