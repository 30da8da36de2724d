//! JSON Web Key as carried by the vault data plane (RFC 7517 member names).
//!
//! Byte-valued members stay base64url strings; material is passed through to
//! the vault untouched.

use serde::{Deserialize, Serialize};

use super::key_type::KeyOperation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key identifier (vault URL of the key version)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<KeyOperation>,

    // RSA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    // Symmetric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Protected key blob used for HSM key transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hsm: Option<String>,

    // EC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Members this model does not know about
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JsonWebKey {
    /// Whether any private or secret component is present.
    pub fn has_private_material(&self) -> bool {
        self.d.is_some() || self.k.is_some() || self.key_hsm.is_some()
    }
}
