//! Key Vault data plane client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use super::credential::AccessToken;
use super::error::{Result, VaultError};
use super::{CreateKeyOptions, KeyAttributes, KeyPropertiesUpdate, KeyVault, VaultKey};
use crate::record::{JsonWebKey, KeyOperation, KeyType};

pub const DEFAULT_API_VERSION: &str = "7.4";

/// Key attributes as the vault sends them: timestamps in unix seconds.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recovery_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recoverable_days: Option<i32>,
}

impl WireAttributes {
    fn writable(
        enabled: Option<bool>,
        expires_on: Option<DateTime<Utc>>,
        not_before: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            enabled,
            exp: expires_on.map(|t| t.timestamp()),
            nbf: not_before.map(|t| t.timestamp()),
            ..Default::default()
        }
    }
}

impl From<WireAttributes> for KeyAttributes {
    fn from(wire: WireAttributes) -> Self {
        let ts = |secs: Option<i64>| secs.and_then(|s| DateTime::from_timestamp(s, 0));
        KeyAttributes {
            enabled: wire.enabled,
            created: ts(wire.created),
            updated: ts(wire.updated),
            expires_on: ts(wire.exp),
            not_before: ts(wire.nbf),
            recovery_level: wire.recovery_level,
            recoverable_days: wire.recoverable_days,
        }
    }
}

#[derive(Deserialize)]
struct KeyBundle {
    key: JsonWebKey,
    #[serde(default)]
    attributes: WireAttributes,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct KeyItem {
    kid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyListResult {
    #[serde(default)]
    value: Vec<KeyItem>,
    next_link: Option<String>,
}

#[derive(Serialize)]
struct CreateKeyRequest<'a> {
    kty: &'a str,
    #[serde(skip_serializing_if = "no_ops")]
    key_ops: &'a [KeyOperation],
    attributes: WireAttributes,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a BTreeMap<String, String>,
}

fn no_ops(ops: &&[KeyOperation]) -> bool {
    ops.is_empty()
}

fn no_tags(tags: &&BTreeMap<String, String>) -> bool {
    tags.is_empty()
}

#[derive(Serialize)]
struct ImportKeyRequest<'a> {
    key: &'a JsonWebKey,
    #[serde(rename = "Hsm", skip_serializing_if = "Option::is_none")]
    hsm: Option<bool>,
}

#[derive(Serialize)]
struct UpdateKeyRequest<'a> {
    attributes: WireAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a BTreeMap<String, String>>,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Vault backed by the Key Vault REST API.
pub struct RestVault {
    client: Client,
    base_url: Url,
    api_version: String,
}

impl RestVault {
    /// Create a client for the vault at `base_url`, authenticating with `token`.
    pub fn new(
        base_url: Url,
        token: &AccessToken,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(VaultError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", token.token)
            .parse()
            .map_err(|_| VaultError::Credential("token is not a valid header value".to_string()))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_version: api_version.to_string(),
        })
    }


    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        url
    }

    /// Follow `nextLink` paging and collect item ids.
    async fn list_kids(&self, first: Url, what: &str) -> Result<Vec<String>> {
        let mut kids = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let response = self.client.get(url).send().await?;
            let page: KeyListResult = check(response, what).await?.json().await?;
            kids.extend(page.value.into_iter().map(|item| item.kid));
            next = match page.next_link.filter(|l| !l.is_empty()) {
                Some(link) => Some(Url::parse(&link)?),
                None => None,
            };
        }

        Ok(kids)
    }

    async fn read_bundle(response: Response, what: &str) -> Result<VaultKey> {
        let bundle: KeyBundle = check(response, what).await?.json().await?;
        bundle_to_key(bundle)
    }
}

/// Map a non-success response to a `VaultError`.
async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap_or_default();
    let message = if envelope.error.message.is_empty() {
        body
    } else {
        envelope.error.message
    };

    Err(match status {
        StatusCode::NOT_FOUND => VaultError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VaultError::Auth {
            status: status.as_u16(),
            message,
        },
        _ => VaultError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message,
        },
    })
}

/// Split a key id (`https://<vault>/keys/<name>[/<version>]`) into name and version.
fn parse_kid(kid: &str) -> Result<(String, Option<String>)> {
    let url = Url::parse(kid)?;
    let mut segments = url
        .path_segments()
        .ok_or_else(|| VaultError::InvalidResponse(format!("bad key id: {}", kid)))?
        .skip_while(|s| *s != "keys")
        .skip(1);

    let name = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VaultError::InvalidResponse(format!("bad key id: {}", kid)))?;
    let version = segments.next().filter(|s| !s.is_empty());

    Ok((name.to_string(), version.map(|v| v.to_string())))
}

fn bundle_to_key(bundle: KeyBundle) -> Result<VaultKey> {
    let kid = bundle
        .key
        .kid
        .clone()
        .ok_or_else(|| VaultError::InvalidResponse("key bundle without kid".to_string()))?;
    let (name, version) = parse_kid(&kid)?;

    Ok(VaultKey {
        name,
        version,
        key: bundle.key,
        attributes: bundle.attributes.into(),
        tags: bundle.tags.unwrap_or_default(),
    })
}

#[async_trait]
impl KeyVault for RestVault {
    async fn list_key_names(&self) -> Result<Vec<String>> {
        let kids = self.list_kids(self.endpoint(&["keys"]), "keys").await?;
        kids.iter()
            .map(|kid| parse_kid(kid).map(|(name, _)| name))
            .collect()
    }

    async fn list_key_versions(&self, name: &str) -> Result<Vec<String>> {
        let kids = self
            .list_kids(self.endpoint(&["keys", name, "versions"]), name)
            .await?;
        kids.iter()
            .map(|kid| {
                parse_kid(kid)?.1.ok_or_else(|| {
                    VaultError::InvalidResponse(format!("version id without version: {}", kid))
                })
            })
            .collect()
    }

    async fn get_key(&self, name: &str, version: Option<&str>) -> Result<VaultKey> {
        let url = match version {
            Some(v) => self.endpoint(&["keys", name, v]),
            None => self.endpoint(&["keys", name]),
        };
        let response = self.client.get(url).send().await?;
        Self::read_bundle(response, name).await
    }

    async fn create_key(
        &self,
        name: &str,
        key_type: KeyType,
        options: &CreateKeyOptions,
    ) -> Result<VaultKey> {
        let request = CreateKeyRequest {
            kty: key_type.as_str(),
            key_ops: &options.key_operations,
            attributes: WireAttributes::writable(
                options.enabled,
                options.expires_on,
                options.not_before,
            ),
            tags: &options.tags,
        };
        let response = self
            .client
            .post(self.endpoint(&["keys", name, "create"]))
            .json(&request)
            .send()
            .await?;
        Self::read_bundle(response, name).await
    }

    async fn import_key(&self, name: &str, key: &JsonWebKey, hsm: bool) -> Result<VaultKey> {
        let request = ImportKeyRequest {
            key,
            hsm: hsm.then_some(true),
        };
        let response = self
            .client
            .put(self.endpoint(&["keys", name]))
            .json(&request)
            .send()
            .await?;
        Self::read_bundle(response, name).await
    }

    async fn update_key_properties(
        &self,
        name: &str,
        update: &KeyPropertiesUpdate,
    ) -> Result<VaultKey> {
        let request = UpdateKeyRequest {
            attributes: WireAttributes::writable(
                update.enabled,
                update.expires_on,
                update.not_before,
            ),
            tags: update.tags.as_ref(),
        };
        // An empty version segment addresses the latest version
        let response = self
            .client
            .patch(self.endpoint(&["keys", name, ""]))
            .json(&request)
            .send()
            .await?;
        Self::read_bundle(response, name).await
    }
}
