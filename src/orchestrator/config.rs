//! Orchestrator configuration
//!
//! Knobs for the round loop itself; endpoint addressing lives in the
//! service config.

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard cap on model invocations per user turn
    ///
    /// Guarantees termination even for a model that never stops requesting
    /// actions.
    pub max_rounds: u32,
    /// Number of persisted messages included in the outbound context
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            history_window: 10,
        }
    }
}
