//! Conversation models and persistence
//!
//! The store is a plain append-only JSON log; the orchestrator owns all
//! windowing and round bookkeeping.

pub mod models;
pub mod store;

pub use models::{ChatMessage, ChatRole, StoredMessage};
pub use store::{ConversationStore, StoreError};
