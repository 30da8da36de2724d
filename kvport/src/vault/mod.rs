//! The vault collaborator: everything export and import need from a key vault.
//!
//! [`KeyVault`] is the seam; [`RestVault`] implements it against the Key Vault
//! data plane and [`InMemoryVault`] keeps keys in process for tests.

pub mod credential;
pub mod error;
pub mod memory;
pub mod rest;

pub use credential::{AccessToken, CredentialChain, CredentialSource};
pub use error::VaultError;
pub use memory::{InMemoryVault, VaultCall, VaultOp};
pub use rest::RestVault;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::record::{JsonWebKey, KeyOperation, KeyType};
use error::Result;

/// Attributes the vault keeps alongside a key version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyAttributes {
    pub enabled: Option<bool>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub expires_on: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub recovery_level: Option<String>,
    pub recoverable_days: Option<i32>,
}

/// A key version as fetched from the vault.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultKey {
    pub name: String,
    pub version: Option<String>,
    pub key: JsonWebKey,
    pub attributes: KeyAttributes,
    pub tags: BTreeMap<String, String>,
}

/// Options for creating a new key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateKeyOptions {
    pub enabled: Option<bool>,
    pub expires_on: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub tags: BTreeMap<String, String>,
    pub key_operations: Vec<KeyOperation>,
}

/// Property changes applied to the latest version of a key.
///
/// `tags`, when set, replaces the key's tags wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyPropertiesUpdate {
    pub enabled: Option<bool>,
    pub expires_on: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub tags: Option<BTreeMap<String, String>>,
}

impl KeyPropertiesUpdate {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.expires_on.is_none()
            && self.not_before.is_none()
            && self.tags.is_none()
    }
}

/// Operations a key vault must offer.
///
/// Calls are issued one at a time; implementations need not support
/// concurrent use beyond `Send + Sync`.
#[async_trait]
pub trait KeyVault: Send + Sync {
    /// Names of all keys, in vault enumeration order.
    async fn list_key_names(&self) -> Result<Vec<String>>;

    /// Versions of one key, in vault enumeration order.
    async fn list_key_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Fetch a key; `None` means the latest version.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` if the key or version does not exist.
    async fn get_key(&self, name: &str, version: Option<&str>) -> Result<VaultKey>;

    /// Existence probe. Only "not found" maps to `false`; any other failure
    /// is returned as an error.
    async fn key_exists(&self, name: &str) -> Result<bool> {
        match self.get_key(name, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a new key (or a new version of an existing one).
    async fn create_key(
        &self,
        name: &str,
        key_type: KeyType,
        options: &CreateKeyOptions,
    ) -> Result<VaultKey>;

    /// Import existing key material under `name`. With `hsm` the vault
    /// protects the imported key in a hardware module.
    async fn import_key(&self, name: &str, key: &JsonWebKey, hsm: bool) -> Result<VaultKey>;

    /// Update properties of the latest version of a key.
    async fn update_key_properties(
        &self,
        name: &str,
        update: &KeyPropertiesUpdate,
    ) -> Result<VaultKey>;
}

/// Validate a vault name: 3-24 characters, ASCII letters, digits and hyphens,
/// starting with a letter, no trailing or consecutive hyphens.
pub fn validate_vault_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("KeyVaultName is required.".to_string());
    }
    if !(3..=24).contains(&name.len()) {
        return Err(format!(
            "Invalid vault name '{}': must be 3-24 characters long",
            name
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!(
            "Invalid vault name '{}': only letters, digits and hyphens are allowed",
            name
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(format!("Invalid vault name '{}': must start with a letter", name));
    }
    if name.ends_with('-') || name.contains("--") {
        return Err(format!(
            "Invalid vault name '{}': trailing or consecutive hyphens are not allowed",
            name
        ));
    }
    Ok(())
}
