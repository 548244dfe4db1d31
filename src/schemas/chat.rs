//! Client-facing request/response types for `POST /api/chat`

use serde::{Deserialize, Serialize};

/// Incoming chat request from the browser client
///
/// Field names follow the JavaScript client (`pdfText`, `userInput`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Text already extracted from the PDF by the caller
    pub pdf_text: String,

    /// The user's question about the PDF
    pub user_input: String,
}

impl ChatRequest {
    pub fn new(pdf_text: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            pdf_text: pdf_text.into(),
            user_input: user_input.into(),
        }
    }
}

/// Successful answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

/// Error body returned on failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

/// Role of a message in the upstream conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message forwarded to the inference endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let json = r#"{"pdfText": "Alpha Beta", "userInput": "What is Alpha?"}"#;
        let request: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.pdf_text, "Alpha Beta");
        assert_eq!(request.user_input, "What is Alpha?");
    }

    #[test]
    fn test_request_requires_both_fields() {
        let json = r#"{"pdfText": "Alpha Beta"}"#;
        assert!(serde_json::from_str::<ChatRequest>(json).is_err());
    }

    #[test]
    fn test_message_role_serialization() {
        let message = ChatMessage::system("context");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "context");
    }
}
