//! Import command implementation.

use anyhow::{Context, Result};
use kvport::{Config, ImportEvent, ImportOptions, ImportOutcome, PropertyUpdate};
use std::path::Path;

use super::{connect, render, validate_common};

/// Run the import command.
///
/// Records that fail are counted and reported; they do not fail the command.
pub async fn run_import(
    config: &Config,
    vault_name: &str,
    file_path: &Path,
    skip_existing: bool,
) -> Result<()> {
    validate_common(vault_name, file_path)?;
    if !file_path.exists() {
        anyhow::bail!("Import file not found: {}", file_path.display());
    }

    tracing::info!("Importing keys to KeyVault: {}", vault_name);
    tracing::info!("Input file: {}", file_path.display());
    tracing::info!(
        "Skip existing keys: {}",
        if skip_existing { "Yes" } else { "No" }
    );

    let vault = connect(config, vault_name).await?;
    let options = ImportOptions { skip_existing };

    let summary = kvport::import_file(&vault, file_path, options, |event| match event {
        ImportEvent::Diagnostic(d) => render(d),
        ImportEvent::Record { name, outcome, .. } => log_outcome(name, outcome),
    })
    .await
    .context("Error importing keys")?;

    if summary.errored > 0 {
        tracing::warn!("{} of {} keys failed to import", summary.errored, summary.total());
    }

    Ok(())
}

fn log_outcome(name: &str, outcome: &ImportOutcome) {
    match outcome {
        ImportOutcome::Imported {
            properties: PropertyUpdate::Failed(reason),
            ..
        } => tracing::debug!(key = name, "imported, property update failed: {}", reason),
        ImportOutcome::Failed(e) => tracing::debug!(key = name, "failed: {}", e),
        other => tracing::debug!(key = name, "outcome: {:?}", other),
    }
}
