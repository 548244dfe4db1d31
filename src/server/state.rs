//! Application state container
//!
//! Shared state passed to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::services::{ChatBackend, HttpChatBackend, Relay};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheaply cloneable; the relay holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// The chat relay
    pub relay: Arc<Relay>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create the application state with the HTTP inference backend
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(
            models = ?settings.relay.targets.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            "Creating HTTP chat backend"
        );

        let backend = HttpChatBackend::new(settings.backend_config())
            .context("Failed to build HTTP client for inference backend")?;

        Ok(Self::with_backend(settings, Arc::new(backend)))
    }

    /// Create the application state around an existing backend
    pub fn with_backend(settings: Settings, backend: Arc<dyn ChatBackend>) -> Self {
        let relay = Relay::new(settings.relay.clone(), backend);

        tracing::info!(
            targets = settings.relay.targets.len(),
            truncation = settings.relay.truncation.is_enabled(),
            prompt = %settings.relay.prompt,
            max_attempts = settings.relay.retry.max_attempts,
            "Application state initialized"
        );

        Self {
            settings: Arc::new(settings),
            relay: Arc::new(relay),
            start_time: Instant::now(),
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
