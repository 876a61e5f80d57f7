//! Model completion client
//!
//! Direct HTTP client for the OpenAI-compatible chat completions endpoint.
//! The model is a black-box collaborator: it receives the windowed
//! transcript plus the action catalog and answers with optional text and
//! zero-or-more action requests. Nothing else about it is assumed.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::actions::ActionRequest;
use crate::chat::ChatMessage;
use crate::config::ModelConfig;

use super::types::{CompletionRequest, CompletionResponse, ToolSpec, WireMessage};

/// Errors from the model completion endpoint
///
/// Unlike action failures, these end the whole turn: without a model reply
/// there is nothing to feed back or surface.
#[derive(Error, Debug)]
pub enum ModelError {
    /// No API key is configured
    #[error("model API key is not configured")]
    MissingApiKey,

    /// The endpoint could not be reached or timed out
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("model API returned status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The endpoint answered 2xx with an unusable body
    #[error("model response was unusable: {0}")]
    InvalidResponse(String),
}

/// What one model invocation produced
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Text content, if the model produced any
    pub text: Option<String>,
    /// Requested actions, possibly several per round
    pub requests: Vec<ActionRequest>,
}

impl ModelReply {
    /// Whether this reply terminates the round loop
    pub fn is_final(&self) -> bool {
        self.requests.is_empty()
    }
}

/// HTTP client for the completions endpoint
pub struct ModelClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl ModelClient {
    /// Create a client with the timeout from config
    pub fn new(config: ModelConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    /// Invoke the model once with the transcript and the action catalog
    pub async fn complete(
        &self,
        transcript: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, ModelError> {
        if self.config.api_key.is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: transcript.iter().map(WireMessage::from_chat).collect(),
            tools: tools.to_vec(),
            tool_choice: if tools.is_empty() {
                None
            } else {
                Some("auto".to_string())
            },
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(
            url = %url,
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling model completion API"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::error!(
                status_code = status.as_u16(),
                error_body = %body,
                "Model API returned error status"
            );
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("failed to parse body: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("response contains no choices".into()))?;

        let text = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty());

        let mut requests = Vec::new();
        for call in choice.message.tool_calls.unwrap_or_default() {
            let arguments = serde_json::from_str(&call.function.arguments).map_err(|e| {
                ModelError::InvalidResponse(format!(
                    "tool call '{}' carried unparseable arguments: {}",
                    call.function.name, e
                ))
            })?;
            requests.push(ActionRequest {
                call_id: call.id,
                name: call.function.name,
                arguments,
            });
        }

        debug!(
            has_text = text.is_some(),
            requests = requests.len(),
            "Model reply received"
        );

        Ok(ModelReply { text, requests })
    }
}
