//! Token lifecycle manager
//!
//! State machine per the messenger identity: Unauthenticated →
//! Authenticated → (401 seen) → Refreshing → Authenticated or
//! ReauthRequired. The in-memory credential is the authority; the file
//! store mirrors it. A single mutex is held across every
//! read-refresh-persist sequence, so the authorization callback and
//! concurrent in-flight refreshes serialize instead of clobbering each
//! other's refresh token.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AuthConfig;

use super::credentials::{Credential, CredentialStore};

/// Errors from token lifecycle operations
///
/// `NotAuthenticated` and `RefreshTokenMissing` both mean the caller must
/// send the user through the authorization redirect; the gateway maps them
/// to an `AuthRequired` action failure carrying the authorize URL.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credential is stored for the identity
    #[error("no credential is stored; authorization required")]
    NotAuthenticated,

    /// A refresh was requested but the stored credential has no refresh token
    #[error("stored credential has no refresh token; authorization required")]
    RefreshTokenMissing,

    /// The token endpoint rejected a code or refresh exchange
    #[error("token endpoint rejected the exchange (status {status}): {body}")]
    ExchangeRejected {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Response body returned by the token endpoint
        body: String,
    },

    /// The token endpoint could not be reached
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint answered with an unusable body
    #[error("token endpoint returned an unusable response: {0}")]
    InvalidResponse(String),

    /// The credential record could not be read or written
    #[error("credential persistence failed: {0}")]
    Persist(String),
}

/// Token endpoint response shape (authorization-code and refresh grants)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Owns the messenger credential and its refresh lifecycle
pub struct TokenManager {
    http: reqwest::Client,
    config: AuthConfig,
    store: CredentialStore,
    current: Mutex<Option<Credential>>,
}

impl TokenManager {
    /// Create a manager, loading any previously persisted credential
    ///
    /// A corrupt credential file is logged and treated as unauthenticated
    /// rather than preventing startup.
    pub fn new(config: AuthConfig, store: CredentialStore) -> Self {
        let initial = match store.load() {
            Ok(credential) => {
                if credential.is_some() {
                    info!("Loaded persisted messenger credential");
                }
                credential
            }
            Err(e) => {
                warn!(error = %e, "Failed to load persisted credential, starting unauthenticated");
                None
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            config,
            store,
            current: Mutex::new(initial),
        }
    }

    /// Current access token without network access, `None` when unauthenticated
    pub async fn access_token(&self) -> Option<String> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|credential| credential.access_token.clone())
    }

    /// Build the authorization URL a human follows to (re)establish the credential
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            self.config.authorize_url,
            urlencode(&self.config.client_id),
            urlencode(&self.config.redirect_uri),
            urlencode(&self.config.scopes),
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&urlencode(state));
        }
        url
    }

    /// Exchange a refresh token for a new pair after a downstream 401
    ///
    /// `stale_token` is the access token the backend rejected. If another
    /// writer already replaced it, the current token is returned without a
    /// network call; this keeps two concurrent 401s from rotating the
    /// refresh token twice. On success the new pair is persisted, keeping
    /// the previous refresh token when the provider omits a new one.
    pub async fn refresh(&self, stale_token: &str) -> Result<String, AuthError> {
        let mut current = self.current.lock().await;

        let credential = current.as_ref().ok_or(AuthError::NotAuthenticated)?;
        if credential.access_token != stale_token {
            return Ok(credential.access_token.clone());
        }
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or(AuthError::RefreshTokenMissing)?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("refresh_token", refresh_token.clone()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let token = self.exchange(&form).await?;
        info!("Refreshed messenger access token");

        let updated = Credential {
            access_token: token.access_token,
            // Providers may omit the refresh token when it is still valid
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            token_type: token.token_type.or_else(|| credential.token_type.clone()),
            expires_in: token.expires_in,
            scope: token.scope.or_else(|| credential.scope.clone()),
            last_updated: Utc::now().timestamp(),
        };
        if let Err(e) = self.store.save(&updated) {
            // The in-memory pair stays usable for this process either way
            warn!(error = %e, "Failed to persist refreshed credential");
        }

        let access = updated.access_token.clone();
        *current = Some(updated);
        Ok(access)
    }

    /// Complete the authorization-code flow from the provider callback
    ///
    /// This is the externally triggered Unauthenticated/ReauthRequired →
    /// Authenticated transition; it takes the same lock as `refresh` so the
    /// two paths never interleave their writes.
    pub async fn exchange_code(&self, code: &str) -> Result<(), AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("code", code.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let mut current = self.current.lock().await;
        let token = self.exchange(&form).await?;

        let credential = Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            scope: token.scope,
            last_updated: Utc::now().timestamp(),
        };
        self.store.save(&credential)?;
        *current = Some(credential);
        info!("Messenger identity authorized via callback");
        Ok(())
    }

    /// POST a grant to the token endpoint and parse the response
    async fn exchange(&self, form: &[(&str, String)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(status = status.as_u16(), "Token endpoint rejected exchange");
            return Err(AuthError::ExchangeRejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

/// Minimal percent-encoding for query components
///
/// Covers the characters that actually occur in client ids, redirect URIs
/// and space-separated scope lists.
fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push_str("%20"),
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(token_url: &str) -> AuthConfig {
        AuthConfig {
            authorize_url: "https://provider.test/oauth/authorize".to_string(),
            token_url: token_url.to_string(),
            client_id: "client-123".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8080/api/auth/callback".to_string(),
            scopes: "messages friends".to_string(),
        }
    }

    fn seeded_manager(dir: &TempDir, token_url: &str, refresh_token: Option<&str>) -> TokenManager {
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store
            .save(&Credential {
                access_token: "stale-token".to_string(),
                refresh_token: refresh_token.map(str::to_string),
                token_type: Some("bearer".to_string()),
                expires_in: Some(21599),
                scope: Some("messages".to_string()),
                last_updated: 0,
            })
            .unwrap();
        TokenManager::new(test_config(token_url), store)
    }

    #[test]
    fn test_authorize_url_contains_client_and_scopes() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        let manager = TokenManager::new(test_config("https://provider.test/oauth/token"), store);

        let url = manager.authorize_url(Some("xyz"));
        assert!(url.starts_with("https://provider.test/oauth/authorize?response_type=code"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("scope=messages%20friends"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080"));
    }

    #[tokio::test]
    async fn test_access_token_none_when_unauthenticated() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        let manager = TokenManager::new(test_config("https://provider.test/oauth/token"), store);
        assert!(manager.access_token().await.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_refresh_rotates_and_persists_pair() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"access_token": "fresh-token", "refresh_token": "refresh-2", "token_type": "bearer", "expires_in": 21599}"#,
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let token_url = format!("{}/oauth/token", server.url());
        let manager = seeded_manager(&dir, &token_url, Some("refresh-1"));

        let token = manager.refresh("stale-token").await.unwrap();
        mock.assert_async().await;
        assert_eq!(token, "fresh-token");
        assert_eq!(manager.access_token().await.as_deref(), Some("fresh-token"));

        // The file mirrors the rotated pair
        let persisted = CredentialStore::new(dir.path().join("credentials.json"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(persisted.access_token, "fresh-token");
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    #[serial]
    async fn test_refresh_preserves_refresh_token_when_omitted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token": "fresh-token"}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let token_url = format!("{}/oauth/token", server.url());
        let manager = seeded_manager(&dir, &token_url, Some("refresh-1"));

        manager.refresh("stale-token").await.unwrap();
        let persisted = CredentialStore::new(dir.path().join("credentials.json"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    #[serial]
    async fn test_refresh_skips_exchange_when_token_already_rotated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let token_url = format!("{}/oauth/token", server.url());
        let manager = seeded_manager(&dir, &token_url, Some("refresh-1"));

        // The stored token is no longer the one that was rejected
        let token = manager.refresh("an-older-token").await.unwrap();
        assert_eq!(token, "stale-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    #[serial]
    async fn test_concurrent_refreshes_exchange_only_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .with_status(200)
            .with_body(r#"{"access_token": "fresh-token", "refresh_token": "refresh-2"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let token_url = format!("{}/oauth/token", server.url());
        let manager = seeded_manager(&dir, &token_url, Some("refresh-1"));

        // Two turns see the same 401 and race into refresh; the mutex
        // serializes them and the loser reuses the winner's token
        let (first, second) = tokio::join!(
            manager.refresh("stale-token"),
            manager.refresh("stale-token")
        );
        assert_eq!(first.unwrap(), "fresh-token");
        assert_eq!(second.unwrap(), "fresh-token");
        mock.assert_async().await;

        let persisted = CredentialStore::new(dir.path().join("credentials.json"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_requires_reauth() {
        let dir = TempDir::new().unwrap();
        let manager = seeded_manager(&dir, "https://provider.test/oauth/token", None);

        let result = manager.refresh("stale-token").await;
        assert!(matches!(result, Err(AuthError::RefreshTokenMissing)));
    }

    #[tokio::test]
    #[serial]
    async fn test_refresh_rejected_by_provider() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let token_url = format!("{}/oauth/token", server.url());
        let manager = seeded_manager(&dir, &token_url, Some("refresh-1"));

        let result = manager.refresh("stale-token").await;
        match result {
            Err(AuthError::ExchangeRejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected ExchangeRejected, got {:?}", other),
        }
        // The stale credential is untouched
        assert_eq!(manager.access_token().await.as_deref(), Some("stale-token"));
    }

    #[tokio::test]
    #[serial]
    async fn test_exchange_code_authorizes_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "one-time-code".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"access_token": "first-token", "refresh_token": "refresh-1", "scope": "messages"}"#,
            )
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        let token_url = format!("{}/oauth/token", server.url());
        let manager = TokenManager::new(test_config(&token_url), store);

        manager.exchange_code("one-time-code").await.unwrap();
        mock.assert_async().await;
        assert_eq!(manager.access_token().await.as_deref(), Some("first-token"));
    }
}
