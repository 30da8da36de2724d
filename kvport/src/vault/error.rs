//! Vault collaborator errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// Key (or key version) does not exist
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Vault returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Connection failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Credential error: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound(_))
            || matches!(self, VaultError::Api { status: 404, .. })
    }

    /// Check if this is an authentication or authorization failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, VaultError::Auth { .. } | VaultError::Credential(_))
    }
}
