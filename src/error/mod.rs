//! Error types surfaced over HTTP

pub mod types;

pub use types::ApiError;
