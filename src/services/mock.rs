//! Scripted backend for tests

use async_trait::async_trait;
use std::sync::Mutex;

use crate::schemas::ChatMessage;
use crate::services::backend::{ChatBackend, GenerationParams, ModelTarget, UpstreamError};

/// One recorded call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: ModelTarget,
    pub messages: Vec<ChatMessage>,
}

/// A hand-rolled [`ChatBackend`] that replays scripted outcomes.
///
/// Each call pops the next outcome; the last one repeats once the script
/// runs out.
pub struct ScriptedBackend {
    outcomes: Mutex<Vec<Result<String, UpstreamError>>>,
    fallback: Result<String, UpstreamError>,
    credential: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn always(outcome: Result<String, UpstreamError>) -> Self {
        Self::with_sequence(vec![outcome])
    }

    pub fn replying(reply: &str) -> Self {
        Self::always(Ok(reply.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::always(Err(UpstreamError::Http(message.to_string())))
    }

    pub fn with_sequence(mut outcomes: Vec<Result<String, UpstreamError>>) -> Self {
        assert!(!outcomes.is_empty(), "script must have at least one outcome");
        outcomes.reverse();
        let fallback = outcomes[0].clone();
        Self {
            outcomes: Mutex::new(outcomes),
            fallback,
            credential: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn complete(
        &self,
        target: &ModelTarget,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<String, UpstreamError> {
        self.calls.lock().unwrap().push(RecordedCall {
            target: target.clone(),
            messages: messages.to_vec(),
        });

        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
