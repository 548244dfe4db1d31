//! Retry-and-fallback chat relay
//!
//! Turns a [`ChatRequest`] into an answer by walking the configured model
//! targets in order, retrying each one per the [`RetryPolicy`], and
//! classifying the last failure when every target is exhausted.

use std::sync::Arc;
use thiserror::Error;

use crate::schemas::{ChatReply, ChatRequest};
use crate::services::backend::{ChatBackend, GenerationParams, ModelTarget, UpstreamError};
use crate::services::classifier::ErrorClassifier;
use crate::services::prompt::PromptTemplate;
use crate::services::truncation::TruncationPolicy;
use crate::utils::retry::{retry_with_delay, RetryPolicy};

/// Failure of a whole relay request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Missing credential or unusable configuration; never retried
    #[error("{0}")]
    Configuration(String),

    /// Every attempt against every target failed
    #[error("{detail}")]
    Exhausted {
        /// Model whose failure was classified
        model: String,
        /// Upstream calls made in total
        attempts: u32,
        /// Classified, user-facing description
        detail: String,
    },
}

impl RelayError {
    /// Text surfaced to the client
    pub fn detail(&self) -> &str {
        match self {
            RelayError::Configuration(msg) => msg,
            RelayError::Exhausted { detail, .. } => detail,
        }
    }
}

/// Static relay configuration for one deployment
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Candidate models in priority order
    pub targets: Vec<ModelTarget>,
    pub truncation: TruncationPolicy,
    pub prompt: PromptTemplate,
    /// Applied to each target separately
    pub retry: RetryPolicy,
    pub params: GenerationParams,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                ModelTarget::remote("meta-llama/Llama-3.3-70B-Instruct"),
                ModelTarget::remote("meta-llama/Llama-3.2-8B-Instruct"),
            ],
            truncation: TruncationPolicy::default(),
            prompt: PromptTemplate::default(),
            retry: RetryPolicy::default(),
            params: GenerationParams::default(),
        }
    }
}

impl RelayConfig {
    /// Whether any target needs the remote credential
    pub fn requires_credential(&self) -> bool {
        self.targets.iter().any(ModelTarget::is_remote)
    }
}

/// The relay itself; cheap to share behind an `Arc`
pub struct Relay {
    config: RelayConfig,
    backend: Arc<dyn ChatBackend>,
    classifier: ErrorClassifier,
}

impl Relay {
    pub fn new(config: RelayConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            classifier: ErrorClassifier::default(),
        }
    }

    /// Replace the default classification rules
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Answer a question about the given PDF text
    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatReply, RelayError> {
        if self.config.requires_credential() && !self.backend.has_credential() {
            tracing::error!("Remote model target configured but no API key is available");
            return Err(RelayError::Configuration(
                UpstreamError::MissingCredential.to_string(),
            ));
        }

        let (pdf_text, user_input) = self
            .config
            .truncation
            .apply(&request.pdf_text, &request.user_input);

        tracing::debug!(
            pdf_chars = pdf_text.chars().count(),
            input_chars = user_input.chars().count(),
            truncation = self.config.truncation.is_enabled(),
            "Prepared relay input"
        );

        let messages = self.config.prompt.build_messages(&pdf_text, &user_input);
        let params = self.config.params;

        let mut total_attempts = 0;
        let mut last_failure: Option<(&ModelTarget, UpstreamError)> = None;

        for target in &self.config.targets {
            let outcome = retry_with_delay(
                &self.config.retry,
                UpstreamError::is_retryable,
                |attempt, err| {
                    tracing::warn!(
                        attempt,
                        model = %target.model,
                        kind = %target.kind,
                        error = %err,
                        "Model attempt failed"
                    );
                },
                || self.backend.complete(target, &messages, &params),
            )
            .await;

            total_attempts += outcome.attempts;

            match outcome.result {
                Ok(reply) => {
                    tracing::info!(
                        model = %target.model,
                        kind = %target.kind,
                        attempts = total_attempts,
                        "Relay request succeeded"
                    );
                    return Ok(ChatReply::new(reply));
                }
                Err(UpstreamError::MissingCredential) => {
                    return Err(RelayError::Configuration(
                        UpstreamError::MissingCredential.to_string(),
                    ));
                }
                Err(err) => {
                    tracing::warn!(
                        model = %target.model,
                        attempts = outcome.attempts,
                        "Model exhausted, falling back to next target"
                    );
                    last_failure = Some((target, err));
                }
            }
        }

        let (target, err) = last_failure
            .ok_or_else(|| RelayError::Configuration("No model targets configured".to_string()))?;

        let detail = self.classifier.classify(&err.to_string(), target);
        tracing::error!(
            model = %target.model,
            attempts = total_attempts,
            error = %err,
            detail = %detail,
            "All model targets failed"
        );

        Err(RelayError::Exhausted {
            model: target.model.clone(),
            attempts: total_attempts,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::ChatRole;
    use crate::services::classifier::{ClassificationRule, Matcher};
    use crate::services::mock::ScriptedBackend;
    use std::time::Duration;

    fn config(targets: Vec<ModelTarget>, max_attempts: u32) -> RelayConfig {
        RelayConfig {
            targets,
            retry: RetryPolicy::new(max_attempts, Duration::ZERO),
            ..RelayConfig::default()
        }
    }

    fn transient(msg: &str) -> Result<String, UpstreamError> {
        Err(UpstreamError::Http(msg.to_string()))
    }

    #[tokio::test]
    async fn test_truncated_pdf_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::replying("Alpha is a term."));
        let relay = Relay::new(
            config(vec![ModelTarget::remote("m1")], 3),
            backend.clone(),
        );

        let mut pdf_text = String::from("Alpha Beta Gamma ");
        while pdf_text.len() < 600 {
            pdf_text.push_str("Delta Epsilon ");
        }
        pdf_text.truncate(600);
        let request = ChatRequest::new(pdf_text.clone(), "What is Alpha?");

        let reply = relay.handle(&request).await.unwrap();
        assert_eq!(reply, ChatReply::new("Alpha is a term."));

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        let system = &calls[0].messages[0];
        assert_eq!(system.role, ChatRole::System);
        assert!(system.content.contains(&pdf_text[..500]));
        assert!(!system.content.contains(&pdf_text[..501]));
        assert_eq!(calls[0].messages[1].content, "What is Alpha?");
    }

    #[tokio::test]
    async fn test_untruncated_deployment_forwards_everything() {
        let backend = Arc::new(ScriptedBackend::replying("ok"));
        let relay = Relay::new(
            RelayConfig {
                truncation: TruncationPolicy::Disabled,
                ..config(vec![ModelTarget::local("llama3")], 1)
            },
            backend.clone(),
        );

        let pdf_text = "z".repeat(2_000);
        let question = "q".repeat(300);
        relay
            .handle(&ChatRequest::new(pdf_text.clone(), question.clone()))
            .await
            .unwrap();

        let calls = backend.calls();
        assert!(calls[0].messages[0].content.contains(&pdf_text));
        assert_eq!(calls[0].messages[1].content, question);
    }

    #[tokio::test]
    async fn test_success_after_k_failures_stops_calling() {
        // Two targets, two attempts each; the fourth call succeeds
        let backend = Arc::new(ScriptedBackend::with_sequence(vec![
            transient("boom"),
            transient("boom"),
            transient("boom"),
            Ok("fallback answer".to_string()),
            Ok("should never be used".to_string()),
        ]));
        let relay = Relay::new(
            config(vec![ModelTarget::remote("m1"), ModelTarget::remote("m2")], 2),
            backend.clone(),
        );

        let reply = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap();
        assert_eq!(reply.reply, "fallback answer");
        assert_eq!(backend.call_count(), 4);

        let models: Vec<String> = backend.calls().into_iter().map(|c| c.target.model).collect();
        assert_eq!(models, vec!["m1", "m1", "m2", "m2"]);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits_remaining_models() {
        let backend = Arc::new(ScriptedBackend::replying("first"));
        let relay = Relay::new(
            config(
                vec![ModelTarget::remote("m1"), ModelTarget::remote("m2"), ModelTarget::local("m3")],
                3,
            ),
            backend.clone(),
        );

        relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap();
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_makes_attempts_times_models_calls() {
        let backend = Arc::new(ScriptedBackend::failing("upstream down"));
        let relay = Relay::new(
            config(
                vec![ModelTarget::remote("m1"), ModelTarget::remote("m2"), ModelTarget::remote("m3")],
                3,
            ),
            backend.clone(),
        );

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert_eq!(backend.call_count(), 9);
        match err {
            RelayError::Exhausted { model, attempts, .. } => {
                assert_eq!(model, "m3");
                assert_eq!(attempts, 9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::replying("unused").without_credential());
        let relay = Relay::new(config(vec![ModelTarget::remote("m1")], 3), backend.clone());

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert_eq!(err, RelayError::Configuration("API key not configured".to_string()));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_local_only_relay_needs_no_credential() {
        let backend = Arc::new(ScriptedBackend::replying("local").without_credential());
        let relay = Relay::new(config(vec![ModelTarget::local("llama3")], 1), backend.clone());

        let reply = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap();
        assert_eq!(reply.reply, "local");
    }

    #[tokio::test]
    async fn test_connection_refused_is_passed_through() {
        let backend = Arc::new(ScriptedBackend::failing("connection refused"));
        let relay = Relay::new(config(vec![ModelTarget::remote("m1")], 3), backend.clone());

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert_eq!(backend.call_count(), 3);
        assert!(err.detail().starts_with("Error processing request"));
        assert!(err.detail().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_rate_limit_message_from_any_model() {
        let backend = Arc::new(ScriptedBackend::always(Err(UpstreamError::Status {
            status: 429,
            message: "Rate Limit reached for requests".to_string(),
        })));
        let relay = Relay::new(
            config(vec![ModelTarget::remote("m1"), ModelTarget::local("m2")], 1),
            backend,
        );

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert_eq!(
            err.detail(),
            "Error processing request: Rate limit exceeded, try again later (or reduce input size)."
        );
    }

    #[tokio::test]
    async fn test_custom_classifier_is_used() {
        let backend = Arc::new(ScriptedBackend::failing("gateway timeout"));
        let relay = Relay::new(config(vec![ModelTarget::remote("m1")], 1), backend).with_classifier(
            ErrorClassifier::new(vec![ClassificationRule::new(
                Matcher::contains("timeout"),
                "{model} timed out",
            )]),
        );

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert_eq!(err.detail(), "Error processing request: m1 timed out");
    }

    #[tokio::test]
    async fn test_no_targets_is_configuration_error() {
        let backend = Arc::new(ScriptedBackend::replying("unused"));
        let relay = Relay::new(config(Vec::new(), 3), backend.clone());

        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_between_attempts() {
        let backend = Arc::new(ScriptedBackend::with_sequence(vec![
            transient("boom"),
            Ok("late".to_string()),
        ]));
        let relay = Relay::new(
            RelayConfig {
                retry: RetryPolicy::new(2, Duration::from_millis(40)),
                ..config(vec![ModelTarget::remote("m1")], 2)
            },
            backend,
        );

        let start = tokio::time::Instant::now();
        relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_between_targets() {
        let backend = Arc::new(ScriptedBackend::failing("connection refused"));
        let relay = Relay::new(
            RelayConfig {
                retry: RetryPolicy::new(3, Duration::from_secs(5)),
                ..config(vec![ModelTarget::remote("m1"), ModelTarget::remote("m2")], 3)
            },
            backend.clone(),
        );

        let start = tokio::time::Instant::now();
        let err = relay.handle(&ChatRequest::new("pdf", "q")).await.unwrap_err();

        assert!(matches!(err, RelayError::Exhausted { attempts: 6, .. }));
        assert_eq!(backend.call_count(), 6);
        // (attempts - 1) waits per target, nothing after a target gives up
        assert_eq!(start.elapsed(), Duration::from_secs(2 * 5 * 2));
    }
}
