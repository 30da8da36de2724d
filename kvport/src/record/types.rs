use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::jwk::JsonWebKey;
use super::key_type::{dedup_operations, KeyOperation};
use crate::vault::{CreateKeyOptions, KeyPropertiesUpdate, VaultKey};

/// Portable representation of one key version.
///
/// Absent optional fields are omitted from the written file rather than
/// written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Kept as text so an unknown type is reported per record on import
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub key_operations: Vec<KeyOperation>,
    /// Informational, not re-importable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_level: Option<String>,
    /// Informational, not re-importable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoverable_days: Option<i32>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub tags: BTreeMap<String, String>,
    /// Never applied on import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_policy: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_parameters: Option<JsonWebKey>,
}

/// Field names as written on export, used for case-insensitive matching.
pub const RECORD_FIELDS: &[&str] = &[
    "name",
    "version",
    "keyType",
    "enabled",
    "created",
    "updated",
    "expiresOn",
    "notBefore",
    "keyOperations",
    "recoveryLevel",
    "recoverableDays",
    "tags",
    "rotationPolicy",
    "keyParameters",
];

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl KeyRecord {
    /// Build a record from a key fetched out of the vault.
    pub fn from_vault_key(key: &VaultKey) -> Self {
        Self {
            name: key.name.clone(),
            version: key.version.clone(),
            key_type: key.key.kty.clone(),
            enabled: key.attributes.enabled,
            created: key.attributes.created,
            updated: key.attributes.updated,
            expires_on: key.attributes.expires_on,
            not_before: key.attributes.not_before,
            key_operations: key.key.key_ops.clone(),
            recovery_level: key.attributes.recovery_level.clone(),
            recoverable_days: key.attributes.recoverable_days,
            tags: key.tags.clone(),
            rotation_policy: None,
            key_parameters: Some(key.key.clone()),
        }
    }

    pub fn has_material(&self) -> bool {
        self.key_parameters.is_some()
    }

    /// Options for creating a fresh key when no material is available.
    pub fn create_options(&self) -> CreateKeyOptions {
        CreateKeyOptions {
            enabled: self.enabled,
            expires_on: self.expires_on,
            not_before: self.not_before,
            tags: self.tags.clone(),
            key_operations: dedup_operations(&self.key_operations),
        }
    }

    /// Property update to follow a material import, or `None` when the record
    /// sets none of enabled/expiry/activation/tags.
    pub fn property_update(&self) -> Option<KeyPropertiesUpdate> {
        let update = KeyPropertiesUpdate {
            enabled: self.enabled,
            expires_on: self.expires_on,
            not_before: self.not_before,
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
        };
        (!update.is_empty()).then_some(update)
    }
}
