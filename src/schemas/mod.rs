//! Request/response schemas
//!
//! Client-facing DTOs and the wire formats of the inference endpoints.

pub mod chat;
pub mod upstream;

pub use chat::{ChatMessage, ChatReply, ChatRequest, ChatRole, ErrorBody};
