//! Bearer token acquisition for the vault data plane.
//!
//! Sources are tried in order and the first one that yields a token wins:
//! an explicit token in the environment, a service principal secret, then the
//! Azure CLI's logged-in account.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::error::{Result, VaultError};
use crate::config::AuthConfig;

/// Environment variable holding a ready-made bearer token.
pub const TOKEN_ENV: &str = "KVPORT_ACCESS_TOKEN";

/// Resource the vault data plane expects tokens for.
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Token read from an environment variable
    Environment { var: String },
    /// OAuth2 client-credentials flow for a service principal
    ClientSecret {
        authority_host: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// `az account get-access-token`
    AzureCli,
}

impl CredentialSource {
    fn name(&self) -> &'static str {
        match self {
            CredentialSource::Environment { .. } => "environment",
            CredentialSource::ClientSecret { .. } => "client secret",
            CredentialSource::AzureCli => "azure cli",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(rename = "expires_on")]
    expires_on: Option<i64>,
}

pub struct CredentialChain {
    sources: Vec<CredentialSource>,
    client: Client,
}

impl CredentialChain {
    pub fn new(sources: Vec<CredentialSource>) -> Self {
        Self {
            sources,
            client: Client::new(),
        }
    }

    /// Standard chain: environment token, service principal (env vars take
    /// precedence over config), Azure CLI.
    pub fn from_config(auth: &AuthConfig) -> Self {
        let mut sources = vec![CredentialSource::Environment {
            var: TOKEN_ENV.to_string(),
        }];

        let env_or = |var: &str, fallback: &Option<String>| {
            std::env::var(var).ok().filter(|v| !v.is_empty()).or_else(|| fallback.clone())
        };
        let tenant = env_or("AZURE_TENANT_ID", &auth.tenant_id);
        let client_id = env_or("AZURE_CLIENT_ID", &auth.client_id);
        let secret = env_or("AZURE_CLIENT_SECRET", &auth.client_secret);
        if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (tenant, client_id, secret)
        {
            sources.push(CredentialSource::ClientSecret {
                authority_host: auth.authority_host.clone(),
                tenant_id,
                client_id,
                client_secret,
            });
        }

        sources.push(CredentialSource::AzureCli);
        Self::new(sources)
    }

    pub fn sources(&self) -> &[CredentialSource] {
        &self.sources
    }

    /// Get a token for the vault resource from the first source that works.
    pub async fn get_token(&self) -> Result<AccessToken> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match self.fetch(source).await {
                Ok(token) => {
                    tracing::debug!("Acquired vault token from {} credential", source.name());
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!("{} credential unavailable: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(VaultError::Credential(format!(
            "no credential source produced a token ({})",
            failures.join("; ")
        )))
    }

    async fn fetch(&self, source: &CredentialSource) -> Result<AccessToken> {
        match source {
            CredentialSource::Environment { var } => match std::env::var(var) {
                Ok(token) if !token.trim().is_empty() => Ok(AccessToken {
                    token: token.trim().to_string(),
                    expires_on: None,
                }),
                _ => Err(VaultError::Credential(format!("{} is not set", var))),
            },
            CredentialSource::ClientSecret {
                authority_host,
                tenant_id,
                client_id,
                client_secret,
            } => {
                let url = format!(
                    "{}/{}/oauth2/v2.0/token",
                    authority_host.trim_end_matches('/'),
                    tenant_id
                );
                let scope = format!("{}/.default", VAULT_RESOURCE);
                let response = self
                    .client
                    .post(&url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("scope", scope.as_str()),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(VaultError::Auth {
                        status: status.as_u16(),
                        message: body,
                    });
                }

                let token: TokenResponse = response.json().await?;
                Ok(AccessToken {
                    token: token.access_token,
                    expires_on: token
                        .expires_in
                        .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
                })
            }
            CredentialSource::AzureCli => {
                let output = tokio::process::Command::new("az")
                    .args([
                        "account",
                        "get-access-token",
                        "--resource",
                        VAULT_RESOURCE,
                        "--output",
                        "json",
                    ])
                    .output()
                    .await
                    .map_err(|e| VaultError::Credential(format!("cannot run az: {}", e)))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(VaultError::Credential(stderr.trim().to_string()));
                }

                parse_cli_token(&output.stdout)
            }
        }
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let parsed: CliTokenResponse = serde_json::from_slice(stdout)
        .map_err(|e| VaultError::Credential(format!("unexpected az output: {}", e)))?;
    Ok(AccessToken {
        token: parsed.access_token,
        expires_on: parsed
            .expires_on
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_token() {
        let out = br#"{"accessToken":"eyJ0","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tokenType":"Bearer"}"#;
        let token = parse_cli_token(out).unwrap();
        assert_eq!(token.token, "eyJ0");
        assert_eq!(token.expires_on.unwrap().timestamp(), 1893456000);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken {
            token: "secret-value".to_string(),
            expires_on: None,
        };
        assert!(!format!("{:?}", token).contains("secret-value"));
    }

    #[test]
    fn test_from_config_uses_configured_secret() {
        let auth = AuthConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let chain = CredentialChain::from_config(&auth);
        assert!(matches!(
            chain.sources().first(),
            Some(CredentialSource::Environment { .. })
        ));
        assert!(chain
            .sources()
            .iter()
            .any(|s| matches!(s, CredentialSource::ClientSecret { .. })));
        assert!(matches!(chain.sources().last(), Some(CredentialSource::AzureCli)));
    }

    #[tokio::test]
    async fn test_environment_source_missing_var() {
        let chain = CredentialChain::new(vec![CredentialSource::Environment {
            var: "KVPORT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
        }]);
        let err = chain.get_token().await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("environment"));
    }
}
