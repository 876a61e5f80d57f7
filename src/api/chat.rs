//! Chat API
//!
//! The conversational surface: one endpoint runs a full orchestrated turn,
//! the others expose and reset the persisted transcript. When a turn hits
//! an unresolved credential expiry, the response carries a structured
//! reauthorization payload instead of plain text so the frontend can render
//! a login affordance — no keyword sniffing on the answer.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::{ChatRole, StoredMessage};
use crate::error::AppError;
use crate::state::AppContext;

#[allow(missing_docs)]
#[derive(Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
}

/// Body of the `response` field: plain text, or a reauthorization prompt
#[derive(Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Final natural-language answer
    Text(String),
    /// The turn needs the user to re-authorize the messenger identity
    AuthPrompt {
        /// Always true; lets the frontend branch without probing types
        auth_required: bool,
        /// URL the user should be sent to
        auth_url: String,
    },
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct ChatTurnResponse {
    pub response: ResponsePayload,
    pub timestamp: String,
}

/// Run one orchestrated turn for a user message
///
/// The user message is persisted before the turn runs, so a model outage
/// never loses what the user said; the assistant answer is persisted after.
pub async fn chat(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::InvalidRequest("Message is empty".to_string()));
    }

    info!(message_len = request.message.len(), "Chat turn received");
    ctx.store.append(ChatRole::User, &request.message).await?;

    let recent = ctx.store.tail(ctx.orchestrator.history_window()).await;
    let outcome = ctx.orchestrator.run_turn(&recent).await?;

    info!(
        rounds = outcome.rounds,
        capped = outcome.capped,
        reauth = outcome.reauth_url.is_some(),
        "Chat turn finished"
    );
    let stored = ctx.store.append(ChatRole::Assistant, &outcome.answer).await?;

    let response = match outcome.reauth_url {
        Some(auth_url) => ResponsePayload::AuthPrompt {
            auth_required: true,
            auth_url,
        },
        None => ResponsePayload::Text(outcome.answer),
    };

    Ok(Json(ChatTurnResponse {
        response,
        timestamp: stored.timestamp,
    }))
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct HistoryResponse {
    pub history: Vec<StoredMessage>,
}

/// Return the full persisted transcript
pub async fn history(State(ctx): State<Arc<AppContext>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: ctx.store.history().await,
    })
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct ClearResponse {
    pub message: String,
}

/// Clear the persisted transcript
pub async fn clear(State(ctx): State<Arc<AppContext>>) -> Result<Json<ClearResponse>, AppError> {
    ctx.store.clear().await?;
    Ok(Json(ClearResponse {
        message: "Conversation history cleared.".to_string(),
    }))
}
