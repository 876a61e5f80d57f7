//! HTTP API handlers
//!
//! Thin I/O wrappers over the orchestrator, the conversation store and the
//! token manager. All domain behavior lives below this layer.

pub mod auth;
pub mod chat;
