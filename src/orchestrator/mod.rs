//! Conversation orchestration
//!
//! The round loop (`turn`), the model completion client (`api_client`) and
//! its wire types (`types`), plus the loop's own configuration.

pub mod api_client;
pub mod config;
pub mod turn;
pub mod types;

pub use api_client::{ModelClient, ModelError, ModelReply};
pub use config::OrchestratorConfig;
pub use turn::{Orchestrator, TurnOutcome};
