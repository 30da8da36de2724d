//! In-process vault that records every call made against it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::error::{Result, VaultError};
use super::{CreateKeyOptions, KeyAttributes, KeyPropertiesUpdate, KeyVault, VaultKey};
use crate::record::{JsonWebKey, KeyType};

/// Kind of vault operation, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultOp {
    ListKeys,
    ListVersions,
    GetKey,
    CreateKey,
    ImportKey,
    UpdateProperties,
}

/// A call made against an [`InMemoryVault`], with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum VaultCall {
    ListKeys,
    ListVersions {
        name: String,
    },
    GetKey {
        name: String,
        version: Option<String>,
    },
    CreateKey {
        name: String,
        key_type: KeyType,
        options: CreateKeyOptions,
    },
    ImportKey {
        name: String,
        key: JsonWebKey,
        hsm: bool,
    },
    UpdateProperties {
        name: String,
        update: KeyPropertiesUpdate,
    },
}

impl VaultCall {
    pub fn op(&self) -> VaultOp {
        match self {
            VaultCall::ListKeys => VaultOp::ListKeys,
            VaultCall::ListVersions { .. } => VaultOp::ListVersions,
            VaultCall::GetKey { .. } => VaultOp::GetKey,
            VaultCall::CreateKey { .. } => VaultOp::CreateKey,
            VaultCall::ImportKey { .. } => VaultOp::ImportKey,
            VaultCall::UpdateProperties { .. } => VaultOp::UpdateProperties,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self.op(),
            VaultOp::CreateKey | VaultOp::ImportKey | VaultOp::UpdateProperties
        )
    }
}

#[derive(Default)]
struct State {
    /// Keys in insertion order, each with its versions oldest first
    keys: Vec<(String, Vec<VaultKey>)>,
    calls: Vec<VaultCall>,
    failures: Vec<(VaultOp, Option<String>)>,
    next_version: u64,
}

impl State {
    fn versions(&self, name: &str) -> Option<&Vec<VaultKey>> {
        self.keys.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn versions_mut(&mut self, name: &str) -> Option<&mut Vec<VaultKey>> {
        self.keys.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn new_version(&mut self) -> String {
        self.next_version += 1;
        format!("{:032x}", self.next_version)
    }

    fn push(&mut self, key: VaultKey) {
        match self.versions_mut(&key.name) {
            Some(versions) => versions.push(key),
            None => self.keys.push((key.name.clone(), vec![key])),
        }
    }

    fn check(&self, op: VaultOp, name: Option<&str>) -> Result<()> {
        let hit = self.failures.iter().any(|(fop, fname)| {
            *fop == op && (fname.is_none() || fname.as_deref() == name)
        });
        if hit {
            return Err(VaultError::Api {
                status: 500,
                code: "InjectedFailure".to_string(),
                message: format!("{:?} failed for {}", op, name.unwrap_or("*")),
            });
        }
        Ok(())
    }
}

/// Vault kept entirely in memory.
///
/// Keys and versions are enumerated in insertion order. Every call is logged
/// and can be inspected with [`InMemoryVault::calls`].
pub struct InMemoryVault {
    base_url: String,
    state: Mutex<State>,
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self {
            base_url: "https://memory.vault.azure.net".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Seed a key version. A missing version tag is assigned.
    pub fn insert(&self, mut key: VaultKey) {
        let mut state = self.state.lock();
        let version = match key.version.clone() {
            Some(v) => v,
            None => state.new_version(),
        };
        key.key.kid = Some(self.kid(&key.name, &version));
        key.version = Some(version);
        state.push(key);
    }

    pub fn with_key(self, key: VaultKey) -> Self {
        self.insert(key);
        self
    }

    /// Make every call of `op` fail, optionally only for one key name.
    pub fn fail_on(&self, op: VaultOp, name: Option<&str>) {
        self.state
            .lock()
            .failures
            .push((op, name.map(|n| n.to_string())));
    }

    pub fn calls(&self) -> Vec<VaultCall> {
        self.state.lock().calls.clone()
    }

    /// Only create/import/update calls.
    pub fn mutations(&self) -> Vec<VaultCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn key_names(&self) -> Vec<String> {
        self.state.lock().keys.iter().map(|(n, _)| n.clone()).collect()
    }

    /// All versions of a key, oldest first.
    pub fn versions(&self, name: &str) -> Vec<VaultKey> {
        self.state.lock().versions(name).cloned().unwrap_or_default()
    }

    pub fn latest(&self, name: &str) -> Option<VaultKey> {
        self.state
            .lock()
            .versions(name)
            .and_then(|v| v.last().cloned())
    }

    fn kid(&self, name: &str, version: &str) -> String {
        format!("{}/keys/{}/{}", self.base_url, name, version)
    }
}

#[async_trait]
impl KeyVault for InMemoryVault {
    async fn list_key_names(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::ListKeys);
        state.check(VaultOp::ListKeys, None)?;
        Ok(state.keys.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn list_key_versions(&self, name: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::ListVersions {
            name: name.to_string(),
        });
        state.check(VaultOp::ListVersions, Some(name))?;
        let versions = state
            .versions(name)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        Ok(versions.iter().filter_map(|k| k.version.clone()).collect())
    }

    async fn get_key(&self, name: &str, version: Option<&str>) -> Result<VaultKey> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::GetKey {
            name: name.to_string(),
            version: version.map(|v| v.to_string()),
        });
        state.check(VaultOp::GetKey, Some(name))?;
        let versions = state
            .versions(name)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        let found = match version {
            Some(v) => versions.iter().find(|k| k.version.as_deref() == Some(v)),
            None => versions.last(),
        };
        found
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("{}/{}", name, version.unwrap_or(""))))
    }

    async fn create_key(
        &self,
        name: &str,
        key_type: KeyType,
        options: &CreateKeyOptions,
    ) -> Result<VaultKey> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::CreateKey {
            name: name.to_string(),
            key_type,
            options: options.clone(),
        });
        state.check(VaultOp::CreateKey, Some(name))?;

        let version = state.new_version();
        let now = Utc::now();
        let key = VaultKey {
            name: name.to_string(),
            version: Some(version.clone()),
            key: JsonWebKey {
                kid: Some(self.kid(name, &version)),
                kty: key_type.as_str().to_string(),
                key_ops: options.key_operations.clone(),
                ..Default::default()
            },
            attributes: KeyAttributes {
                enabled: Some(options.enabled.unwrap_or(true)),
                created: Some(now),
                updated: Some(now),
                expires_on: options.expires_on,
                not_before: options.not_before,
                recovery_level: Some("Recoverable+Purgeable".to_string()),
                recoverable_days: Some(90),
            },
            tags: options.tags.clone(),
        };
        state.push(key.clone());
        Ok(key)
    }

    async fn import_key(&self, name: &str, key: &JsonWebKey, hsm: bool) -> Result<VaultKey> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::ImportKey {
            name: name.to_string(),
            key: key.clone(),
            hsm,
        });
        state.check(VaultOp::ImportKey, Some(name))?;

        let version = state.new_version();
        let now = Utc::now();
        let mut jwk = key.clone();
        jwk.kid = Some(self.kid(name, &version));
        let imported = VaultKey {
            name: name.to_string(),
            version: Some(version),
            key: jwk,
            attributes: KeyAttributes {
                enabled: Some(true),
                created: Some(now),
                updated: Some(now),
                recovery_level: Some("Recoverable+Purgeable".to_string()),
                recoverable_days: Some(90),
                ..Default::default()
            },
            tags: Default::default(),
        };
        state.push(imported.clone());
        Ok(imported)
    }

    async fn update_key_properties(
        &self,
        name: &str,
        update: &KeyPropertiesUpdate,
    ) -> Result<VaultKey> {
        let mut state = self.state.lock();
        state.calls.push(VaultCall::UpdateProperties {
            name: name.to_string(),
            update: update.clone(),
        });
        state.check(VaultOp::UpdateProperties, Some(name))?;

        let latest = state
            .versions_mut(name)
            .and_then(|v| v.last_mut())
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        if let Some(enabled) = update.enabled {
            latest.attributes.enabled = Some(enabled);
        }
        if let Some(exp) = update.expires_on {
            latest.attributes.expires_on = Some(exp);
        }
        if let Some(nbf) = update.not_before {
            latest.attributes.not_before = Some(nbf);
        }
        if let Some(tags) = &update.tags {
            latest.tags = tags.clone();
        }
        latest.attributes.updated = Some(Utc::now());
        Ok(latest.clone())
    }
}
