//! PDF chat relay library
//!
//! Answers questions about PDF text by relaying a constructed prompt to a
//! remote or local chat completion endpoint, with per-model retries and
//! fallback across an ordered list of models.

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod schemas;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
pub use services::{Relay, RelayConfig, RelayError};
