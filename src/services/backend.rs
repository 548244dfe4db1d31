//! Inference backend abstraction
//!
//! The relay only knows how to ask a [`ChatBackend`] for one completion
//! from one [`ModelTarget`]; how the call is made lives behind the trait.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::schemas::ChatMessage;

// ============================================================================
// Targets
// ============================================================================

/// Where a model is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Hosted chat completions API, needs a bearer credential
    Remote,
    /// Inference process reachable by host/port (Ollama)
    Local,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Remote => write!(f, "remote"),
            EndpointKind::Local => write!(f, "local"),
        }
    }
}

/// One candidate model, tried in priority order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelTarget {
    pub kind: EndpointKind,
    pub model: String,
}

impl ModelTarget {
    pub fn remote(model: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Remote,
            model: model.into(),
        }
    }

    pub fn local(model: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Local,
            model: model.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.kind == EndpointKind::Remote
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.model)
    }
}

impl FromStr for ModelTarget {
    type Err = anyhow::Error;

    /// Parses `local:<id>`, `remote:<id>` or a bare `<id>` (remote).
    ///
    /// Only a recognised prefix is split off, so `local:llama3:8b` is the
    /// local model `llama3:8b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, model) = match s.split_once(':') {
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case("local") => (EndpointKind::Local, rest),
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case("remote") => (EndpointKind::Remote, rest),
            _ => (EndpointKind::Remote, s),
        };

        let model = model.trim();
        if model.is_empty() {
            anyhow::bail!("Invalid model target '{}': model id is empty", s);
        }

        Ok(Self {
            kind,
            model: model.to_string(),
        })
    }
}

/// Sampling parameters forwarded with every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// `max_tokens` for remote targets, `num_predict` for local ones
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 50,
            temperature: 0.7,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of a single upstream attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("API key not configured")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Upstream returned an empty reply")]
    EmptyReply,
}

impl UpstreamError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UpstreamError::MissingCredential)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display omits the cause ("connection refused", "timed out")
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        UpstreamError::Http(message)
    }
}

// ============================================================================
// Backend trait
// ============================================================================

/// Something that can produce one chat completion
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether a credential for remote targets is available
    fn has_credential(&self) -> bool;

    /// Run one completion and return the trimmed reply text
    async fn complete(
        &self,
        target: &ModelTarget,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        assert_eq!(
            "remote:meta-llama/Llama-3.3-70B-Instruct".parse::<ModelTarget>().unwrap(),
            ModelTarget::remote("meta-llama/Llama-3.3-70B-Instruct")
        );
        assert_eq!(
            "local:llama3:8b".parse::<ModelTarget>().unwrap(),
            ModelTarget::local("llama3:8b")
        );
        assert_eq!(
            " meta-llama/Llama-3.2-8B-Instruct ".parse::<ModelTarget>().unwrap(),
            ModelTarget::remote("meta-llama/Llama-3.2-8B-Instruct")
        );
        assert_eq!(
            "LOCAL:mistral".parse::<ModelTarget>().unwrap(),
            ModelTarget::local("mistral")
        );
    }

    #[test]
    fn test_parse_rejects_empty_model() {
        assert!("local:".parse::<ModelTarget>().is_err());
        assert!("".parse::<ModelTarget>().is_err());
    }

    #[test]
    fn test_target_display_round_trips() {
        let target = ModelTarget::local("llama3:8b");
        assert_eq!(target.to_string(), "local:llama3:8b");
        assert_eq!(target.to_string().parse::<ModelTarget>().unwrap(), target);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(!UpstreamError::MissingCredential.is_retryable());
        assert!(UpstreamError::Http("connection refused".into()).is_retryable());
        assert!(UpstreamError::EmptyReply.is_retryable());
        assert!(UpstreamError::Status {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
    }
}
