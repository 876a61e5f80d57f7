//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Every remote collaborator (model endpoint, action
//! backends, authorization provider) is addressed through this module so
//! tests can point the service at local mock servers.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Model completion endpoint configuration
    pub model: ModelConfig,
    /// Remote action backend configuration
    pub backends: BackendConfig,
    /// Authorization provider configuration (messenger identity)
    pub auth: AuthConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Model completion endpoint configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API key for the completion endpoint
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Model name to request
    pub model: String,
    /// Upper bound on completion tokens per invocation
    pub max_tokens: u32,
    /// Timeout for a single model invocation (in seconds)
    pub timeout_secs: u64,
}

/// Remote action backend configuration
///
/// One base URL per independent backend, plus the static credentials the
/// repos and forum services expect. The messenger backend authenticates
/// with the bearer token managed by [`crate::auth::TokenManager`] instead.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the messenger action executor
    pub messenger_base: String,
    /// Base URL of the repository listing executor
    pub repos_base: String,
    /// Static API token for the repository executor (optional)
    pub repos_token: Option<String>,
    /// Base URL of the developer forum executor
    pub forum_base: String,
    /// API key for the forum executor (optional)
    pub forum_api_key: Option<String>,
    /// API username paired with the forum key (optional)
    pub forum_api_username: Option<String>,
    /// Base URL of the helpdesk executor (tickets, customers, developers)
    pub helpdesk_base: String,
    /// Base URL of the daily quote executor
    pub quotes_base: String,
    /// Timeout for a single action call (in seconds)
    pub action_timeout_secs: u64,
}

/// Authorization provider configuration for the messenger identity
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Authorize endpoint the user is redirected to
    pub authorize_url: String,
    /// Token endpoint used for code and refresh exchanges
    pub token_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret (optional, some providers omit it)
    pub client_secret: Option<String>,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Space-separated scopes to request
    pub scopes: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory for the conversation log and credential record
    pub data_dir: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            model: ModelConfig {
                api_key: env::var("MODEL_API_KEY").unwrap_or_default(),
                base_url: env::var("MODEL_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("MODEL_NAME").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                max_tokens: 2000,
                timeout_secs: env::var("MODEL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(60),
            },
            backends: BackendConfig {
                messenger_base: env::var("MESSENGER_API_BASE")
                    .unwrap_or_else(|_| "http://localhost:5003".to_string()),
                repos_base: env::var("REPOS_API_BASE")
                    .unwrap_or_else(|_| "http://localhost:5011".to_string()),
                repos_token: env::var("REPOS_API_TOKEN").ok().filter(|t| !t.is_empty()),
                forum_base: env::var("FORUM_API_BASE")
                    .unwrap_or_else(|_| "http://localhost:5006".to_string()),
                forum_api_key: env::var("FORUM_API_KEY").ok().filter(|k| !k.is_empty()),
                forum_api_username: env::var("FORUM_API_USERNAME")
                    .ok()
                    .filter(|u| !u.is_empty()),
                helpdesk_base: env::var("HELPDESK_API_BASE")
                    .unwrap_or_else(|_| "http://localhost:5005".to_string()),
                quotes_base: env::var("QUOTES_API_BASE")
                    .unwrap_or_else(|_| "http://localhost:5004".to_string()),
                action_timeout_secs: env::var("ACTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(10),
            },
            auth: AuthConfig {
                authorize_url: env::var("AUTH_AUTHORIZE_URL")
                    .unwrap_or_else(|_| "https://auth.example.com/oauth/authorize".to_string()),
                token_url: env::var("AUTH_TOKEN_URL")
                    .unwrap_or_else(|_| "https://auth.example.com/oauth/token".to_string()),
                client_id: env::var("AUTH_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("AUTH_CLIENT_SECRET").ok().filter(|s| !s.is_empty()),
                redirect_uri: env::var("AUTH_REDIRECT_URI")
                    .unwrap_or_else(|_| "http://127.0.0.1:8080/api/auth/callback".to_string()),
                scopes: env::var("AUTH_SCOPES")
                    .unwrap_or_else(|_| "messages friends profile".to_string()),
            },
            persistence: PersistenceConfig {
                data_dir: env::var("DATA_DIR").unwrap_or_else(|_| {
                    // Default to ~/.support-agent or current directory
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.support-agent", home.to_string_lossy())
                    } else {
                        ".support-agent".to_string()
                    }
                }),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Path of the persisted conversation log
    pub fn conversation_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.persistence.data_dir).join("conversation.json")
    }

    /// Path of the persisted credential record
    pub fn credentials_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.persistence.data_dir).join("credentials.json")
    }
}
