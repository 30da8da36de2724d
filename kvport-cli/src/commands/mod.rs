pub mod export;
pub mod import;

pub use export::run_export;
pub use import::run_import;

use anyhow::{Context, Result};
use kvport::vault::{validate_vault_name, CredentialChain};
use kvport::{Config, Diagnostic, Level, RestVault};

/// Connect to the named vault with a token from the standard credential chain.
pub async fn connect(config: &Config, vault_name: &str) -> Result<RestVault> {
    let url = config.vault.vault_url(vault_name)?;
    tracing::debug!("Vault URL: {}", url);

    let token = CredentialChain::from_config(&config.auth)
        .get_token()
        .await
        .context("Failed to acquire a vault access token")?;

    let vault = RestVault::new(
        url,
        &token,
        &config.vault.api_version,
        config.vault.request_timeout(),
    )
    .with_context(|| format!("Failed to create client for vault '{}'", vault_name))?;

    Ok(vault)
}

/// Checks shared by both commands, run before any vault call.
pub fn validate_common(vault_name: &str, file_path: &std::path::Path) -> Result<()> {
    validate_vault_name(vault_name).map_err(anyhow::Error::msg)?;
    if file_path.as_os_str().is_empty() {
        anyhow::bail!("FilePath is required.");
    }
    Ok(())
}

/// Render a diagnostic through tracing.
pub fn render(diagnostic: &Diagnostic) {
    let key = diagnostic.key.as_deref().unwrap_or("-");
    match diagnostic.level {
        Level::Info => tracing::info!(key = key, "{}", diagnostic.message),
        Level::Warning => tracing::warn!(key = key, "{}", diagnostic.message),
        Level::Error => tracing::error!(key = key, "{}", diagnostic.message),
    }
}
