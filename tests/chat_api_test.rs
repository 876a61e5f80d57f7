//! Integration tests for the HTTP handlers
//!
//! These call the axum handlers directly with a wired-up `AppContext`,
//! verifying request validation, transcript persistence and the structured
//! reauthorization payload contract.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serial_test::serial;
use tempfile::TempDir;

use support_agent_backend::api::auth::{callback, CallbackQuery};
use support_agent_backend::api::chat::{chat, clear, history, ChatTurnRequest, ResponsePayload};
use support_agent_backend::chat::ChatRole;
use support_agent_backend::config::{
    AuthConfig, BackendConfig, Config, ModelConfig, PersistenceConfig, ServerConfig,
};
use support_agent_backend::error::AppError;
use support_agent_backend::state::AppContext;

fn test_config(dir: &TempDir, model_base: &str, token_url: &str) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        model: ModelConfig {
            api_key: "test-key".to_string(),
            base_url: model_base.to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            timeout_secs: 5,
        },
        backends: BackendConfig {
            messenger_base: "http://127.0.0.1:9".to_string(),
            repos_base: "http://127.0.0.1:9".to_string(),
            repos_token: None,
            forum_base: "http://127.0.0.1:9".to_string(),
            forum_api_key: None,
            forum_api_username: None,
            helpdesk_base: "http://127.0.0.1:9".to_string(),
            quotes_base: "http://127.0.0.1:9".to_string(),
            action_timeout_secs: 5,
        },
        auth: AuthConfig {
            authorize_url: "https://provider.test/oauth/authorize".to_string(),
            token_url: token_url.to_string(),
            client_id: "client-123".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8080/api/auth/callback".to_string(),
            scopes: "messages friends".to_string(),
        },
        persistence: PersistenceConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
        },
    }
}

fn context(dir: &TempDir, model_base: &str, token_url: &str) -> Arc<AppContext> {
    Arc::new(AppContext::from_config(test_config(dir, model_base, token_url)).unwrap())
}

#[tokio::test]
#[serial]
async fn test_chat_turn_answers_and_persists_both_messages() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Hi there!"}}]}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server.url(), "https://provider.test/oauth/token");

    let response = chat(
        State(Arc::clone(&ctx)),
        Json(ChatTurnRequest {
            message: "hello".to_string(),
        }),
    )
    .await
    .unwrap();

    match &response.0.response {
        ResponsePayload::Text(text) => assert_eq!(text, "Hi there!"),
        ResponsePayload::AuthPrompt { .. } => panic!("expected a plain text answer"),
    }
    assert!(!response.0.timestamp.is_empty());

    let transcript = history(State(Arc::clone(&ctx))).await;
    assert_eq!(transcript.0.history.len(), 2);
    assert_eq!(transcript.0.history[0].role, ChatRole::User);
    assert_eq!(transcript.0.history[0].content, "hello");
    assert_eq!(transcript.0.history[1].role, ChatRole::Assistant);
    assert_eq!(transcript.0.history[1].content, "Hi there!");
}

#[tokio::test]
async fn test_empty_message_is_rejected_before_any_model_call() {
    let dir = TempDir::new().unwrap();
    let ctx = context(
        &dir,
        "http://127.0.0.1:9",
        "https://provider.test/oauth/token",
    );

    let result = chat(
        State(Arc::clone(&ctx)),
        Json(ChatTurnRequest {
            message: "   ".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    // Nothing was persisted for the rejected turn
    assert!(history(State(ctx)).await.0.history.is_empty());
}

#[tokio::test]
#[serial]
async fn test_clear_resets_the_transcript() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "noted"}}]}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server.url(), "https://provider.test/oauth/token");

    chat(
        State(Arc::clone(&ctx)),
        Json(ChatTurnRequest {
            message: "remember this".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(history(State(Arc::clone(&ctx))).await.0.history.len(), 2);

    let cleared = clear(State(Arc::clone(&ctx))).await.unwrap();
    assert!(cleared.0.message.contains("cleared"));
    assert!(history(State(ctx)).await.0.history.is_empty());
}

#[tokio::test]
async fn test_callback_without_code_is_rejected() {
    let dir = TempDir::new().unwrap();
    let ctx = context(
        &dir,
        "http://127.0.0.1:9",
        "https://provider.test/oauth/token",
    );

    let result = callback(
        State(ctx),
        Query(CallbackQuery {
            code: None,
            state: None,
            error: None,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_callback_surfaces_provider_denial() {
    let dir = TempDir::new().unwrap();
    let ctx = context(
        &dir,
        "http://127.0.0.1:9",
        "https://provider.test/oauth/token",
    );

    let result = callback(
        State(ctx),
        Query(CallbackQuery {
            code: None,
            state: None,
            error: Some("access_denied".to_string()),
        }),
    )
    .await;

    match result {
        Err(AppError::InvalidRequest(message)) => assert!(message.contains("access_denied")),
        other => panic!("expected InvalidRequest, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
#[serial]
async fn test_callback_with_code_authorizes_the_identity() {
    let mut server = mockito::Server::new_async().await;
    let exchange = server
        .mock("POST", "/oauth/token")
        .match_body(mockito::Matcher::UrlEncoded(
            "code".into(),
            "one-time-code".into(),
        ))
        .with_status(200)
        .with_body(r#"{"access_token": "first-token", "refresh_token": "refresh-1"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_url = format!("{}/oauth/token", server.url());
    let ctx = context(&dir, "http://127.0.0.1:9", &token_url);

    let response = callback(
        State(Arc::clone(&ctx)),
        Query(CallbackQuery {
            code: Some("one-time-code".to_string()),
            state: Some("xyz".to_string()),
            error: None,
        }),
    )
    .await
    .unwrap();

    exchange.assert_async().await;
    assert_eq!(response.0.status, "authorized");
    assert_eq!(ctx.tokens.access_token().await.as_deref(), Some("first-token"));
}
