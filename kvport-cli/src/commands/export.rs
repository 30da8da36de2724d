//! Export command implementation.

use anyhow::{Context, Result};
use kvport::{Config, ExportOptions};
use std::path::Path;

use super::{connect, render, validate_common};

/// Run the export command.
pub async fn run_export(
    config: &Config,
    vault_name: &str,
    file_path: &Path,
    include_all_versions: bool,
) -> Result<()> {
    validate_common(vault_name, file_path)?;

    tracing::info!("Exporting keys from KeyVault: {}", vault_name);
    tracing::info!("Output file: {}", file_path.display());
    tracing::info!(
        "Include all versions: {}",
        if include_all_versions { "Yes" } else { "No" }
    );

    let vault = connect(config, vault_name).await?;
    let options = ExportOptions {
        include_all_versions,
    };

    let report = kvport::export_to_file(&vault, file_path, &options, |d| render(&d))
        .await
        .context("Error exporting keys")?;

    tracing::info!(
        "{} records from {} keys written to {}",
        report.records,
        report.keys,
        report.output.display()
    );

    Ok(())
}
