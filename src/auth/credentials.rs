//! Persisted credential record
//!
//! A single flat JSON file holds the access/refresh pair for the messenger
//! identity. Reads and writes go through [`CredentialStore`]; the write path
//! uses a temp-file rename so no partial record is ever observable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manager::AuthError;

/// Stored access/refresh token pair for the messenger identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token attached to authenticated action calls
    pub access_token: String,
    /// Token used to mint a new pair after expiry (absent for some grants)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type reported by the provider (normally "bearer")
    #[serde(default)]
    pub token_type: Option<String>,
    /// Provider's expiry hint in seconds, informational only
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Scopes granted with this credential
    #[serde(default)]
    pub scope: Option<String>,
    /// Unix timestamp of the last write
    pub last_updated: i64,
}

/// File-backed store for the credential record
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored credential, if any
    ///
    /// A missing file means no credential has been issued yet and is not an
    /// error.
    pub fn load(&self) -> Result<Option<Credential>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .map_err(|e| AuthError::Persist(format!("failed to read credential file: {}", e)))?;
        let credential = serde_json::from_str(&json)
            .map_err(|e| AuthError::Persist(format!("failed to parse credential file: {}", e)))?;
        Ok(Some(credential))
    }

    /// Persist the credential atomically (temp file + rename)
    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(credential)
            .map_err(|e| AuthError::Persist(format!("failed to serialize credential: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::Persist(format!("failed to create credential directory: {}", e))
            })?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| AuthError::Persist(format!("failed to write credential file: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| AuthError::Persist(format!("failed to move credential file: {}", e)))?;
        Ok(())
    }
}
