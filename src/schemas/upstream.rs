//! Wire formats of the inference endpoints
//!
//! Remote targets speak the OpenAI-compatible chat completions dialect
//! (as exposed by the Hugging Face router); local targets speak the
//! Ollama `/api/chat` dialect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chat::ChatMessage;

// ============================================================================
// Remote (OpenAI-compatible)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RemoteChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteChatResponse {
    #[serde(default)]
    pub choices: Vec<RemoteChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteChoice {
    pub message: RemoteMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl RemoteChatResponse {
    /// Content of the first candidate, if any
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

// ============================================================================
// Local (Ollama)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LocalChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub options: LocalOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalOptions {
    pub num_predict: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalChatResponse {
    #[serde(default)]
    pub message: Option<LocalMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl LocalChatResponse {
    pub fn into_content(self) -> Option<String> {
        self.message.and_then(|m| m.content)
    }
}

// ============================================================================
// Error bodies
// ============================================================================

/// Pull a human-readable message out of an upstream error body.
///
/// Understands `{"error": "..."}` (Ollama, HF router),
/// `{"error": {"message": "..."}}` (OpenAI style) and `{"message": "..."}`.
/// Falls back to the raw body text.
pub fn extract_error_message(body: &str) -> String {
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) => return body.trim().to_string(),
    };

    let message = match parsed.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => parsed
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    message.unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_request_shape() {
        let messages = vec![ChatMessage::system("ctx"), ChatMessage::user("q")];
        let request = RemoteChatRequest {
            model: "meta-llama/Llama-3.3-70B-Instruct",
            messages: &messages,
            max_tokens: 50,
            temperature: 0.7,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "meta-llama/Llama-3.3-70B-Instruct");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_local_request_uses_num_predict() {
        let messages = vec![ChatMessage::user("q")];
        let request = LocalChatRequest {
            model: "llama3",
            messages: &messages,
            stream: false,
            options: LocalOptions {
                num_predict: 64,
                temperature: 0.2,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["num_predict"], 64);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_remote_response_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  hi  "}},{"message":{"content":"other"}}]}"#;
        let response: RemoteChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_content().as_deref(), Some("  hi  "));
    }

    #[test]
    fn test_remote_response_without_choices() {
        let response: RemoteChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_content().is_none());
    }

    #[test]
    fn test_local_response_content() {
        let body = r#"{"model":"llama3","message":{"role":"assistant","content":"answer"},"done":true}"#;
        let response: LocalChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_content().as_deref(), Some("answer"));
    }

    #[test]
    fn test_extract_error_message_variants() {
        assert_eq!(
            extract_error_message(r#"{"error":"model \"llama3\" not found, try pulling it first"}"#),
            "model \"llama3\" not found, try pulling it first"
        );
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"Rate limit reached","type":"rate_limit"}}"#),
            "Rate limit reached"
        );
        assert_eq!(extract_error_message(r#"{"message":"bad"}"#), "bad");
        assert_eq!(extract_error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(extract_error_message(r#"{"other":1}"#), r#"{"other":1}"#);
    }
}
