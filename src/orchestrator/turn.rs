//! Conversation turn orchestration
//!
//! Drives the bounded round-trip protocol between the model and the action
//! gateway: invoke the model, execute whatever actions it asked for, fold
//! the results back into the transcript, repeat until the model answers in
//! plain text or the round cap is hit.

use tracing::{debug, info, warn};

use crate::actions::ActionGateway;
use crate::chat::{ChatMessage, StoredMessage};

use super::api_client::{ModelClient, ModelError};
use super::config::OrchestratorConfig;
use super::types::tool_declarations;

/// Fixed system instruction prefixed to every outbound context
const SYSTEM_PROMPT: &str = "You are a technical support assistant for a developer platform. \
You help with developer accounts, support tickets, forum topics, repository lookups and \
messenger delivery. Use the available actions to fetch real data or perform work before \
answering; never invent ids, ticket states or account details. When an action fails, explain \
the failure briefly and suggest what the user can do next. Answer in the user's language.";

/// Fail-safe answer when the round cap is hit with no usable text
const INCOMPLETE_NOTICE: &str =
    "I couldn't finish the requested work within the allowed number of steps. \
Partial progress may have been made; please try again or narrow the request.";

/// Result of one orchestrated user turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final natural-language answer
    pub answer: String,
    /// Reauthorization URL, if any executed action failed with AuthRequired
    pub reauth_url: Option<String>,
    /// Model invocations spent on this turn
    pub rounds: u32,
    /// Whether the turn was terminated by the round cap
    pub capped: bool,
}

/// Drives user turns against the model and the action gateway
pub struct Orchestrator {
    model: ModelClient,
    gateway: ActionGateway,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(model: ModelClient, gateway: ActionGateway, config: OrchestratorConfig) -> Self {
        Self {
            model,
            gateway,
            config,
        }
    }

    /// Size of the outbound context window, in persisted messages
    pub fn history_window(&self) -> usize {
        self.config.history_window
    }

    /// Run one user turn to completion
    ///
    /// `history` is the persisted transcript, already ending with the new
    /// user message; only the most recent window of it is sent outbound.
    /// Action failures never fail the turn — they are folded back into the
    /// transcript as structured results. Only a model-endpoint error
    /// escapes as `Err`.
    pub async fn run_turn(&self, history: &[StoredMessage]) -> Result<TurnOutcome, ModelError> {
        let tools = tool_declarations();

        let skip = history.len().saturating_sub(self.config.history_window);
        let mut transcript = Vec::with_capacity(history.len() - skip + 1);
        transcript.push(ChatMessage::system(SYSTEM_PROMPT));
        transcript.extend(history[skip..].iter().map(ChatMessage::from));

        let mut rounds = 1u32;
        let mut reauth_url: Option<String> = None;
        let mut reply = self.model.complete(&transcript, &tools).await?;

        // Round loop: text emitted alongside action requests is kept in the
        // transcript for the model's own context but never becomes the
        // answer; only the reply that stops requesting actions counts.
        while !reply.is_final() && rounds < self.config.max_rounds {
            info!(
                round = rounds,
                requested = reply.requests.len(),
                "Model requested actions"
            );
            let requests = reply.requests.clone();
            transcript.push(ChatMessage::action_requests(reply.text.clone(), requests.clone()));

            // Sequential on purpose: later actions in a round may depend on
            // the side effects of earlier ones
            for request in &requests {
                let result = self.gateway.execute(request).await;
                debug!(
                    call_id = %request.call_id,
                    action = %request.name,
                    success = result.is_success(),
                    "Action finished"
                );
                if let Some(url) = result.reauth_url() {
                    reauth_url = Some(url.to_string());
                }
                transcript.push(ChatMessage::action_result(&result));
            }

            rounds += 1;
            reply = self.model.complete(&transcript, &tools).await?;
        }

        let capped = !reply.is_final();
        if capped {
            warn!(
                max_rounds = self.config.max_rounds,
                "Round cap reached with actions still pending"
            );
        }

        let answer = match reply.text {
            Some(text) => text,
            None if capped => INCOMPLETE_NOTICE.to_string(),
            None => String::new(),
        };

        debug!(rounds, capped, "Turn finished");
        Ok(TurnOutcome {
            answer,
            reauth_url,
            rounds,
            capped,
        })
    }
}
