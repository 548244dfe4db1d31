//! HTTP inference backend
//!
//! Talks to remote OpenAI-compatible chat completion APIs (bearer auth) and
//! to a local Ollama process, sharing one reqwest client for both.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::schemas::upstream::{
    extract_error_message, LocalChatRequest, LocalChatResponse, LocalOptions, RemoteChatRequest,
    RemoteChatResponse,
};
use crate::schemas::ChatMessage;
use crate::services::backend::{ChatBackend, EndpointKind, GenerationParams, ModelTarget, UpstreamError};

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_REMOTE_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_LOCAL_HOST: &str = "127.0.0.1";
pub const DEFAULT_LOCAL_PORT: u16 = 11434;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for [`HttpChatBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Bearer credential for remote targets
    pub api_key: Option<String>,

    /// Base URL of the remote API; `/chat/completions` is appended
    pub remote_base_url: String,

    /// Host of the local inference process
    pub local_host: String,

    /// Port of the local inference process
    pub local_port: u16,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            remote_base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port: DEFAULT_LOCAL_PORT,
            timeout_seconds: 60,
        }
    }
}

impl HttpBackendConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.remote_base_url = url.into();
        self
    }

    pub fn with_local_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.local_host = host.into();
        self.local_port = port;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn remote_url(&self) -> String {
        format!("{}/chat/completions", self.remote_base_url.trim_end_matches('/'))
    }

    pub fn local_url(&self) -> String {
        format!("http://{}:{}/api/chat", self.local_host, self.local_port)
    }
}

// ============================================================================
// Backend
// ============================================================================

/// reqwest-based [`ChatBackend`]
#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpChatBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        tracing::info!(
            remote_url = %config.remote_url(),
            local_url = %config.local_url(),
            credential = config.api_key.is_some(),
            timeout_seconds = config.timeout_seconds,
            "Initialized HTTP chat backend"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    async fn complete_remote(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential)?;

        let url = self.config.remote_url();
        let body = RemoteChatRequest {
            model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        tracing::debug!(model = %model, url = %url, "Calling remote chat completions API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: RemoteChatResponse = read_json(response).await?;
        parsed.into_content().ok_or(UpstreamError::EmptyReply)
    }

    async fn complete_local(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        let url = self.config.local_url();
        let body = LocalChatRequest {
            model,
            messages,
            stream: false,
            options: LocalOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
            },
        };

        tracing::debug!(model = %model, url = %url, "Calling local chat API");

        let response = self.client.post(&url).json(&body).send().await?;

        let parsed: LocalChatResponse = read_json(response).await?;
        parsed.into_content().ok_or(UpstreamError::EmptyReply)
    }
}

/// Check the status and decode the body of an upstream response
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message: extract_error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(error = %e, body = %text, "Failed to parse upstream response");
        UpstreamError::Parse(e.to_string())
    })
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn has_credential(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn complete(
        &self,
        target: &ModelTarget,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        let content = match target.kind {
            EndpointKind::Remote => self.complete_remote(&target.model, messages, params).await?,
            EndpointKind::Local => self.complete_local(&target.model, messages, params).await?,
        };

        let reply = content.trim();
        if reply.is_empty() {
            return Err(UpstreamError::EmptyReply);
        }
        Ok(reply.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
