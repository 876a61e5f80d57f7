//! Action gateway
//!
//! Translates a requested action into a call against its remote backend and
//! normalizes every outcome into an [`ActionResult`]. The contract is that
//! `execute` always returns: transport faults, timeouts, rejections and
//! schema failures all come back as structured failure results, never as
//! errors, so the orchestrator can keep the round going.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::auth::TokenManager;
use crate::config::BackendConfig;

use super::outcome::{ActionRequest, ActionResult, FailureKind};
use super::registry::{self, ActionSpec, Backend, SchemaError, ValidatedArguments};

/// A resolved backend call: method, URL and argument placement
struct Route {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl Route {
    fn get(url: String) -> Self {
        Self {
            method: Method::GET,
            url,
            query: Vec::new(),
            body: None,
        }
    }

    fn get_with_query(url: String, query: Vec<(String, String)>) -> Self {
        Self {
            method: Method::GET,
            url,
            query,
            body: None,
        }
    }

    fn post(url: String, body: Value) -> Self {
        Self {
            method: Method::POST,
            url,
            query: Vec::new(),
            body: Some(body),
        }
    }
}

/// Executes validated actions against their remote backends
pub struct ActionGateway {
    http: reqwest::Client,
    backends: BackendConfig,
    tokens: Arc<TokenManager>,
}

impl ActionGateway {
    /// Create a gateway with the per-call timeout from config
    pub fn new(backends: BackendConfig, tokens: Arc<TokenManager>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(backends.action_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            backends,
            tokens,
        }
    }

    /// Execute one action request, always producing exactly one result
    ///
    /// Validation happens first; a schema failure short-circuits before any
    /// network traffic. For authenticated actions a 401 triggers one silent
    /// refresh and one retry, after which the failure is surfaced as
    /// `AuthRequired` with a reauthorization URL.
    pub async fn execute(&self, request: &ActionRequest) -> ActionResult {
        let spec = match registry::find(&request.name) {
            Some(spec) => spec,
            None => {
                warn!(action = %request.name, "Model requested an unknown action");
                return ActionResult::failure(
                    &request.call_id,
                    &request.name,
                    FailureKind::UnknownAction,
                    format!("unknown action '{}'", request.name),
                );
            }
        };

        let validated = match registry::validate(&request.name, &request.arguments) {
            Ok(validated) => validated,
            Err(e) => {
                debug!(action = %request.name, error = %e, "Action arguments failed validation");
                let kind = match e {
                    SchemaError::UnknownAction(_) => FailureKind::UnknownAction,
                    _ => FailureKind::Schema,
                };
                return ActionResult::failure(&request.call_id, &request.name, kind, e.to_string());
            }
        };

        let route = match self.route_for(spec, &validated) {
            Some(route) => route,
            None => {
                // Catalog and routing table drifted apart; treat as unknown
                error!(action = %spec.name, "Action is declared but has no route");
                return ActionResult::failure(
                    &request.call_id,
                    &request.name,
                    FailureKind::UnknownAction,
                    format!("action '{}' has no backend route", spec.name),
                );
            }
        };

        debug!(
            call_id = %request.call_id,
            action = %spec.name,
            method = %route.method,
            url = %route.url,
            "Dispatching action"
        );

        if spec.requires_auth {
            self.dispatch_authenticated(request, spec, &route).await
        } else {
            match self.send(&route, spec.backend, None).await {
                Ok(response) => self.normalize(request, response).await,
                Err(e) => self.transport_failure(request, e),
            }
        }
    }

    /// Dispatch with the bearer identity, refreshing once on 401
    async fn dispatch_authenticated(
        &self,
        request: &ActionRequest,
        spec: &ActionSpec,
        route: &Route,
    ) -> ActionResult {
        let Some(token) = self.tokens.access_token().await else {
            // Unauthenticated state: fail fast with the authorization URL,
            // no point in calling the backend without a token
            return ActionResult::auth_required(
                &request.call_id,
                &request.name,
                self.tokens.authorize_url(None),
            );
        };

        let response = match self.send(route, spec.backend, Some(&token)).await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(request, e),
        };

        if response.status().as_u16() != 401 {
            return self.normalize(request, response).await;
        }

        // One silent refresh, one retry; a second 401 means the human has to
        // re-authorize out of band
        let fresh = match self.tokens.refresh(&token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(action = %spec.name, error = %e, "Token refresh failed");
                return ActionResult::auth_required(
                    &request.call_id,
                    &request.name,
                    self.tokens.authorize_url(None),
                );
            }
        };

        match self.send(route, spec.backend, Some(&fresh)).await {
            Ok(retry) if retry.status().as_u16() == 401 => ActionResult::auth_required(
                &request.call_id,
                &request.name,
                self.tokens.authorize_url(None),
            ),
            Ok(retry) => self.normalize(request, retry).await,
            Err(e) => self.transport_failure(request, e),
        }
    }

    /// Build and send the HTTP request for a route
    async fn send(
        &self,
        route: &Route,
        backend: Backend,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = self.http.request(route.method.clone(), &route.url);
        if !route.query.is_empty() {
            builder = builder.query(&route.query);
        }
        if let Some(body) = &route.body {
            builder = builder.json(body);
        }

        builder = match backend {
            Backend::Repos => match &self.backends.repos_token {
                Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
                None => builder,
            },
            Backend::Forum => {
                let mut builder = builder;
                if let Some(key) = &self.backends.forum_api_key {
                    builder = builder.header("Api-Key", key);
                }
                if let Some(username) = &self.backends.forum_api_username {
                    builder = builder.header("Api-Username", username);
                }
                builder
            }
            _ => builder,
        };

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        builder.send().await
    }

    /// Map a transport-level failure into a result
    fn transport_failure(&self, request: &ActionRequest, error: reqwest::Error) -> ActionResult {
        let kind = if error.is_timeout() {
            FailureKind::RemoteTimeout
        } else {
            FailureKind::Unreachable
        };
        warn!(
            call_id = %request.call_id,
            action = %request.name,
            error = %error,
            "Action transport failure"
        );
        ActionResult::failure(&request.call_id, &request.name, kind, error.to_string())
    }

    /// Normalize an HTTP response into a result
    async fn normalize(&self, request: &ActionRequest, response: reqwest::Response) -> ActionResult {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(
                call_id = %request.call_id,
                action = %request.name,
                status = status.as_u16(),
                "Backend rejected action"
            );
            return ActionResult::rejected(&request.call_id, &request.name, status.as_u16(), body);
        }

        match response.json::<Value>().await {
            Ok(payload) => {
                debug!(call_id = %request.call_id, action = %request.name, "Action succeeded");
                ActionResult::success(&request.call_id, &request.name, payload)
            }
            Err(e) => ActionResult::failure(
                &request.call_id,
                &request.name,
                FailureKind::MalformedResponse,
                format!("backend returned an unparseable body: {}", e),
            ),
        }
    }

    /// Static mapping from action name to backend endpoint
    fn route_for(&self, spec: &ActionSpec, args: &ValidatedArguments) -> Option<Route> {
        let backends = &self.backends;
        let route = match spec.name {
            // Messenger
            "send_message" => Route::post(
                format!("{}/v1/messages/self", backends.messenger_base),
                Value::Object(args.as_object().clone()),
            ),
            "send_message_to_friends" => Route::post(
                format!("{}/v1/messages/friends", backends.messenger_base),
                Value::Object(args.as_object().clone()),
            ),
            "list_friends" => Route::get_with_query(
                format!("{}/v1/friends", backends.messenger_base),
                query_pairs(args),
            ),
            "get_profile" => Route::get(format!("{}/v1/me", backends.messenger_base)),
            // Repos
            "list_repos" => {
                Route::get_with_query(format!("{}/repos", backends.repos_base), query_pairs(args))
            }
            // Forum
            "get_unanswered_count" => {
                Route::get(format!("{}/unanswered/count", backends.forum_base))
            }
            "list_unanswered_topics" => Route::get(format!("{}/unanswered", backends.forum_base)),
            "post_reply" => Route::post(
                format!("{}/replies", backends.forum_base),
                Value::Object(args.as_object().clone()),
            ),
            "list_canned_replies" => {
                Route::get(format!("{}/canned-replies", backends.forum_base))
            }
            // Helpdesk
            "get_customer" => Route::get(format!(
                "{}/customers/{}",
                backends.helpdesk_base,
                args.get_str("customer_id").unwrap_or_default()
            )),
            "check_developer_status" => Route::get(format!(
                "{}/developers/{}",
                backends.helpdesk_base,
                args.get_str("developer_id").unwrap_or_default()
            )),
            "create_unblock_request" => Route::post(
                format!("{}/unblock-requests", backends.helpdesk_base),
                Value::Object(args.as_object().clone()),
            ),
            "create_ticket" => Route::post(
                format!("{}/tickets", backends.helpdesk_base),
                Value::Object(args.as_object().clone()),
            ),
            "get_ticket" => Route::get(format!(
                "{}/tickets/{}",
                backends.helpdesk_base,
                args.get_str("ticket_id").unwrap_or_default()
            )),
            "search_error_logs" => Route::get_with_query(
                format!("{}/logs", backends.helpdesk_base),
                query_pairs(args),
            ),
            "helpdesk_action" => Route::post(
                format!(
                    "{}/actions/{}",
                    backends.helpdesk_base,
                    args.get_str("action").unwrap_or_default()
                ),
                args.get("payload").cloned().unwrap_or_else(|| json!({})),
            ),
            // Quotes
            "get_daily_quote" => Route::get(format!("{}/quote", backends.quotes_base)),
            _ => return None,
        };
        Some(route)
    }
}

/// Render validated scalar arguments as query parameters
fn query_pairs(args: &ValidatedArguments) -> Vec<(String, String)> {
    args.iter()
        .filter_map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((name.clone(), rendered))
        })
        .collect()
}
