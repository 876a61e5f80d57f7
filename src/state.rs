//! Shared application state
//!
//! One context object wired up at startup and handed to every handler; no
//! ambient globals. The token manager is shared between the gateway (silent
//! refresh) and the auth endpoints (out-of-band authorization callback).

use std::sync::Arc;

use crate::actions::ActionGateway;
use crate::auth::{CredentialStore, TokenManager};
use crate::chat::ConversationStore;
use crate::config::Config;
use crate::orchestrator::{ModelClient, Orchestrator, OrchestratorConfig};

/// Everything a request handler needs
pub struct AppContext {
    /// Service configuration
    pub config: Config,
    /// Persisted conversation log
    pub store: ConversationStore,
    /// Messenger credential lifecycle manager
    pub tokens: Arc<TokenManager>,
    /// Turn orchestrator (model client + action gateway)
    pub orchestrator: Orchestrator,
}

impl AppContext {
    /// Wire up the full context from configuration
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = ConversationStore::load(config.conversation_path())?;

        let tokens = Arc::new(TokenManager::new(
            config.auth.clone(),
            CredentialStore::new(config.credentials_path()),
        ));

        let gateway = ActionGateway::new(config.backends.clone(), Arc::clone(&tokens));
        let model = ModelClient::new(config.model.clone());
        let orchestrator = Orchestrator::new(model, gateway, OrchestratorConfig::default());

        Ok(Self {
            config,
            store,
            tokens,
            orchestrator,
        })
    }
}
