//! Services module
//!
//! Contains the relay and its collaborators: the inference backend, prompt
//! construction, input truncation and failure classification.

pub mod backend;
pub mod classifier;
pub mod http_backend;
#[cfg(test)]
pub(crate) mod mock;
pub mod prompt;
pub mod relay;
pub mod truncation;

pub use backend::{ChatBackend, EndpointKind, GenerationParams, ModelTarget, UpstreamError};
pub use classifier::{ClassificationRule, ErrorClassifier, Matcher};
pub use http_backend::{HttpBackendConfig, HttpChatBackend};
pub use prompt::PromptTemplate;
pub use relay::{Relay, RelayConfig, RelayError};
pub use truncation::TruncationPolicy;
