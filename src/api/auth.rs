//! Authorization API
//!
//! The out-of-band half of the credential lifecycle: a human follows the
//! login redirect, the provider calls back with a one-time code, and the
//! token manager exchanges it for the persisted credential. These endpoints
//! run outside any chat turn and may race in-flight refreshes; the token
//! manager serializes the writes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppContext;

/// Redirect the browser to the provider's authorize endpoint
pub async fn login(State(ctx): State<Arc<AppContext>>) -> Redirect {
    let state = Uuid::new_v4().to_string();
    let url = ctx.tokens.authorize_url(Some(&state));
    info!("Redirecting to authorization provider");
    Redirect::temporary(&url)
}

#[allow(missing_docs)]
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Echoed by the provider; not verified server-side
    pub state: Option<String>,
    pub error: Option<String>,
}

#[allow(missing_docs)]
#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: String,
    pub message: String,
}

/// Complete the authorization-code exchange from the provider callback
pub async fn callback(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::InvalidRequest(format!(
            "authorization was denied: {}",
            error
        )));
    }
    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("missing authorization code".to_string()))?;

    ctx.tokens.exchange_code(&code).await?;

    Ok(Json(CallbackResponse {
        status: "authorized".to_string(),
        message: "Messenger account connected. You can close this window.".to_string(),
    }))
}
