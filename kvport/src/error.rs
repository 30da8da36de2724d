use thiserror::Error;

use crate::vault::VaultError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid key file: {0}")]
    InvalidFile(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
