//! Action result contract
//!
//! Every action execution produces exactly one [`ActionResult`], success or
//! failure alike. Failures are data, not errors: the orchestrator feeds them
//! back to the model as structured payloads so it can adapt mid-turn.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single action invocation requested by the model
///
/// Created from a model reply; consumed exactly once by the gateway. The
/// correlation id links the eventual result back to this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Correlation id, unique within a round
    pub call_id: String,
    /// Name of the action to invoke
    pub name: String,
    /// Raw arguments as sent by the model (JSON object)
    pub arguments: Value,
}

/// Classification of an action failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Arguments failed schema validation; no network call was made
    Schema,
    /// The requested action does not exist in the catalog
    UnknownAction,
    /// Transport-level failure reaching the backend
    Unreachable,
    /// The backend did not answer within the per-call timeout
    RemoteTimeout,
    /// The backend rejected the call with a non-401 error status
    RemoteRejected,
    /// A 401 that one refresh-and-retry could not resolve
    AuthRequired,
    /// The backend answered 2xx with a body that could not be parsed
    MalformedResponse,
}

impl FailureKind {
    /// Stable identifier used in payloads shown to the model
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Schema => "schema",
            FailureKind::UnknownAction => "unknown_action",
            FailureKind::Unreachable => "unreachable",
            FailureKind::RemoteTimeout => "remote_timeout",
            FailureKind::RemoteRejected => "remote_rejected",
            FailureKind::AuthRequired => "auth_required",
            FailureKind::MalformedResponse => "malformed_response",
        }
    }
}

/// Details of a failed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable description, also shown to the model
    pub message: String,
    /// HTTP status, when the backend answered at all
    pub status: Option<u16>,
    /// Reauthorization URL, present only for `AuthRequired`
    pub reauth_url: Option<String>,
}

/// Outcome of a single action execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The backend answered 2xx with a parseable payload
    Success(Value),
    /// Any failure, normalized
    Failure(ActionFailure),
}

/// The one result produced for an [`ActionRequest`]
///
/// Immutable once produced; the correlation id matches the originating
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Correlation id copied from the request
    pub call_id: String,
    /// Name of the action that was executed
    pub action: String,
    /// Success payload or normalized failure
    pub outcome: ActionOutcome,
}

impl ActionResult {
    /// Build a success result
    pub fn success(call_id: &str, action: &str, payload: Value) -> Self {
        Self {
            call_id: call_id.to_string(),
            action: action.to_string(),
            outcome: ActionOutcome::Success(payload),
        }
    }

    /// Build a failure result without HTTP status or reauth URL
    pub fn failure(call_id: &str, action: &str, kind: FailureKind, message: String) -> Self {
        Self {
            call_id: call_id.to_string(),
            action: action.to_string(),
            outcome: ActionOutcome::Failure(ActionFailure {
                kind,
                message,
                status: None,
                reauth_url: None,
            }),
        }
    }

    /// Build a rejection result carrying the backend's status and body
    pub fn rejected(call_id: &str, action: &str, status: u16, body: String) -> Self {
        Self {
            call_id: call_id.to_string(),
            action: action.to_string(),
            outcome: ActionOutcome::Failure(ActionFailure {
                kind: FailureKind::RemoteRejected,
                message: body,
                status: Some(status),
                reauth_url: None,
            }),
        }
    }

    /// Build an auth-required result carrying the reauthorization URL
    pub fn auth_required(call_id: &str, action: &str, reauth_url: String) -> Self {
        Self {
            call_id: call_id.to_string(),
            action: action.to_string(),
            outcome: ActionOutcome::Failure(ActionFailure {
                kind: FailureKind::AuthRequired,
                message: "Authentication required; ask the user to re-authorize.".to_string(),
                status: Some(401),
                reauth_url: Some(reauth_url),
            }),
        }
    }

    /// Whether the outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Success(_))
    }

    /// The reauthorization URL, if this result is an `AuthRequired` failure
    pub fn reauth_url(&self) -> Option<&str> {
        match &self.outcome {
            ActionOutcome::Failure(failure) => failure.reauth_url.as_deref(),
            ActionOutcome::Success(_) => None,
        }
    }

    /// Render the outcome as the JSON payload fed back to the model
    pub fn model_payload(&self) -> Value {
        match &self.outcome {
            ActionOutcome::Success(payload) => json!({
                "success": true,
                "data": payload,
            }),
            ActionOutcome::Failure(failure) => {
                let mut error = json!({
                    "kind": failure.kind.as_str(),
                    "message": failure.message,
                });
                if let Some(status) = failure.status {
                    error["status"] = json!(status);
                }
                if let Some(url) = &failure.reauth_url {
                    error["reauth_url"] = json!(url);
                }
                json!({
                    "success": false,
                    "error": error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_payload_shape() {
        let result = ActionResult::success("call_1", "get_profile", json!({"nickname": "kay"}));
        let payload = result.model_payload();
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["data"]["nickname"], json!("kay"));
    }

    #[test]
    fn test_failure_payload_carries_kind_and_status() {
        let result = ActionResult::rejected("call_2", "list_repos", 503, "down".to_string());
        let payload = result.model_payload();
        assert_eq!(payload["success"], json!(false));
        assert_eq!(payload["error"]["kind"], json!("remote_rejected"));
        assert_eq!(payload["error"]["status"], json!(503));
        assert_eq!(payload["error"]["message"], json!("down"));
    }

    #[test]
    fn test_auth_required_payload_carries_url() {
        let result =
            ActionResult::auth_required("call_3", "send_message", "https://auth/login".to_string());
        assert_eq!(result.reauth_url(), Some("https://auth/login"));
        let payload = result.model_payload();
        assert_eq!(payload["error"]["kind"], json!("auth_required"));
        assert_eq!(payload["error"]["reauth_url"], json!("https://auth/login"));
    }

    #[test]
    fn test_schema_failure_has_no_status() {
        let result = ActionResult::failure(
            "call_4",
            "create_ticket",
            FailureKind::Schema,
            "missing required argument 'title'".to_string(),
        );
        assert!(!result.is_success());
        let payload = result.model_payload();
        assert!(payload["error"].get("status").is_none());
    }
}
