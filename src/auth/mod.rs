//! Auth token lifecycle management for the messenger identity
//!
//! One credential (access/refresh token pair) is shared by every action
//! that calls the messenger backend. The manager owns its full lifecycle:
//! loading it at startup, handing out the current access token, refreshing
//! it after a 401, accepting the out-of-band authorization-code callback,
//! and persisting every change atomically.

pub mod credentials;
pub mod manager;

pub use credentials::{Credential, CredentialStore};
pub use manager::{AuthError, TokenManager};
