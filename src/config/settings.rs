//! Application settings and configuration
//!
//! Settings are read from environment variables (and a `.env` file when
//! present) with defaults matching the hosted deployment.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::services::http_backend::{
    HttpBackendConfig, DEFAULT_LOCAL_HOST, DEFAULT_LOCAL_PORT, DEFAULT_REMOTE_BASE_URL,
};
use crate::services::{GenerationParams, ModelTarget, PromptTemplate, RelayConfig, TruncationPolicy};
use crate::utils::RetryPolicy;

const DEFAULT_MODELS: &str =
    "remote:meta-llama/Llama-3.3-70B-Instruct,remote:meta-llama/Llama-3.2-8B-Instruct";
const DEFAULT_ALLOWED_ORIGINS: &str = "https://srthorat.github.io,*";

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Main application settings
#[derive(Clone)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,
    pub log_format: LogFormat,

    // Server settings
    pub host: String,
    pub port: u16,
    /// CORS origins; `*` allows any origin
    pub allowed_origins: Vec<String>,

    // Upstream settings
    /// Bearer credential for remote targets (never logged)
    pub api_key: Option<String>,
    pub remote_base_url: String,
    pub local_host: String,
    pub local_port: u16,
    pub upstream_timeout_seconds: u64,

    // Relay behavior
    pub relay: RelayConfig,
}

impl Settings {
    /// Load settings from environment variables with defaults
    ///
    /// Only parsing errors are reported here; call [`Settings::validate`]
    /// once logging is up so its warnings are not lost.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the process environment
    /// in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let truncation = if parse_bool(&get("TRUNCATE_ENABLED", "true"), true) {
            TruncationPolicy::Prefix {
                pdf_chars: get("TRUNCATE_PDF_CHARS", "500")
                    .parse()
                    .context("Invalid TRUNCATE_PDF_CHARS value")?,
                input_chars: get("TRUNCATE_INPUT_CHARS", "200")
                    .parse()
                    .context("Invalid TRUNCATE_INPUT_CHARS value")?,
            }
        } else {
            TruncationPolicy::Disabled
        };

        let prompt = match lookup("PROMPT_TEMPLATE").filter(|t| !t.trim().is_empty()) {
            Some(template) => PromptTemplate::Custom(template),
            None => get("PROMPT_STYLE", "concise").parse()?,
        };

        let delay_seconds: f64 = get("RETRY_DELAY_SECONDS", "5")
            .parse()
            .context("Invalid RETRY_DELAY_SECONDS value")?;
        let delay = Duration::try_from_secs_f64(delay_seconds.max(0.0))
            .context("Invalid RETRY_DELAY_SECONDS value")?;

        let relay = RelayConfig {
            targets: parse_targets(&get("RELAY_MODELS", DEFAULT_MODELS))?,
            truncation,
            prompt,
            retry: RetryPolicy::new(
                get("RETRY_MAX_ATTEMPTS", "3")
                    .parse()
                    .context("Invalid RETRY_MAX_ATTEMPTS value")?,
                delay,
            ),
            params: GenerationParams {
                max_tokens: get("MAX_TOKENS", "50")
                    .parse()
                    .context("Invalid MAX_TOKENS value")?,
                temperature: get("TEMPERATURE", "0.7")
                    .parse()
                    .context("Invalid TEMPERATURE value")?,
            },
        };

        Ok(Self {
            app_name: get("APP_NAME", "pdf-chat-relay"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: get("ENVIRONMENT", "development").parse().unwrap_or_default(),
            log_level: get("LOG_LEVEL", "info"),
            log_format: get("LOG_FORMAT", "json").parse().unwrap_or_default(),

            host: get("HOST", "0.0.0.0"),
            port: get("PORT", "8000").parse().context("Invalid PORT value")?,
            allowed_origins: split_list(&get("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),

            api_key: lookup("HF_API_KEY").filter(|k| !k.trim().is_empty()),
            remote_base_url: get("REMOTE_BASE_URL", DEFAULT_REMOTE_BASE_URL),
            local_host: get("LOCAL_HOST", DEFAULT_LOCAL_HOST),
            local_port: get("LOCAL_PORT", &DEFAULT_LOCAL_PORT.to_string())
                .parse()
                .context("Invalid LOCAL_PORT value")?,
            upstream_timeout_seconds: get("UPSTREAM_TIMEOUT_SECONDS", "60")
                .parse()
                .context("Invalid UPSTREAM_TIMEOUT_SECONDS value")?,

            relay,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.relay.targets.is_empty() {
            anyhow::bail!("RELAY_MODELS must name at least one model");
        }

        if self.relay.retry.max_attempts == 0 {
            anyhow::bail!("RETRY_MAX_ATTEMPTS must be >= 1");
        }

        if let TruncationPolicy::Prefix {
            pdf_chars,
            input_chars,
        } = self.relay.truncation
        {
            if pdf_chars == 0 || input_chars == 0 {
                anyhow::bail!("Truncation lengths must be > 0 when truncation is enabled");
            }
        }

        if !(0.0..=2.0).contains(&self.relay.params.temperature) {
            anyhow::bail!("TEMPERATURE must be between 0 and 2");
        }

        if self.upstream_timeout_seconds == 0 {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECONDS must be > 0");
        }

        if self.relay.requires_credential() && self.api_key.is_none() {
            tracing::warn!("Remote model targets configured but HF_API_KEY is not set; chat requests will fail");
        }

        if self.environment == Environment::Production && self.allows_any_origin() {
            tracing::warn!("Running in production with a wildcard CORS origin");
        }

        Ok(())
    }

    /// Whether `*` is among the allowed origins
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration for the HTTP inference backend
    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            api_key: self.api_key.clone(),
            remote_base_url: self.remote_base_url.clone(),
            local_host: self.local_host.clone(),
            local_port: self.local_port,
            timeout_seconds: self.upstream_timeout_seconds,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "pdf-chat-relay".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            api_key: None,
            remote_base_url: DEFAULT_REMOTE_BASE_URL.to_string(),
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port: DEFAULT_LOCAL_PORT,
            upstream_timeout_seconds: 60,
            relay: RelayConfig::default(),
        }
    }
}

/// Split a comma-separated list, dropping empty entries
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_targets(value: &str) -> Result<Vec<ModelTarget>> {
    split_list(value)
        .iter()
        .map(|entry| entry.parse::<ModelTarget>())
        .collect::<Result<Vec<_>>>()
        .context("Invalid RELAY_MODELS value")
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
