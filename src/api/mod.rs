//! API endpoint handlers module

pub mod chat;
pub mod health;
