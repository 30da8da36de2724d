//! Configuration for kvport
//!
//! Default config location: ~/.kvport/config.toml. Every section is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::vault::rest::DEFAULT_API_VERSION;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// DNS suffix appended to the vault name (sovereign clouds use their own)
    #[serde(default = "default_dns_suffix")]
    pub dns_suffix: String,
    /// Full vault URL; overrides name + suffix when set
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_dns_suffix() -> String {
    "vault.azure.net".to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            dns_suffix: default_dns_suffix(),
            url: None,
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl VaultConfig {
    /// Data plane URL for the named vault.
    pub fn vault_url(&self, vault_name: &str) -> Result<Url> {
        let raw = match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}.{}/",
                vault_name,
                self.dns_suffix.trim_start_matches('.')
            ),
        };
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid vault URL '{}': {}", raw, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter string; RUST_LOG overrides it
    #[serde(default = "default_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Service principal settings. AZURE_TENANT_ID, AZURE_CLIENT_ID and
/// AZURE_CLIENT_SECRET take precedence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: default_authority_host(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// ~/.kvport/config.toml, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kvport").join("config.toml"))
}

impl Config {
    /// Load config from an explicit path, or the default location when it
    /// exists, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let path = expand_tilde(path)?;
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_from(&path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(Error::Config(format!(
                    "logging.format must be 'pretty' or 'json', got '{}'",
                    other
                )))
            }
        }
        if self.vault.request_timeout_secs == 0 {
            return Err(Error::Config(
                "vault.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
