//! Vault export: enumerate keys, convert each version to a [`KeyRecord`], write
//! the file.
//!
//! Any vault failure aborts the export before the output file is created.

pub mod types;

pub use types::{ExportOptions, ExportReport};

use std::path::Path;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::record::{write_records, KeyRecord};
use crate::vault::{KeyVault, VaultError};

/// Fetch records from the vault, preserving enumeration order.
///
/// One fetch is issued per exported version: the latest version of each key by
/// default, every version with `include_all_versions`.
pub async fn export_records<V, F>(
    vault: &V,
    options: &ExportOptions,
    mut on_diagnostic: F,
) -> std::result::Result<Vec<KeyRecord>, VaultError>
where
    V: KeyVault + ?Sized,
    F: FnMut(Diagnostic),
{
    let mut records = Vec::new();

    for name in vault.list_key_names().await? {
        on_diagnostic(Diagnostic::info(
            Some(&name),
            format!("Processing key: {}", name),
        ));

        if options.include_all_versions {
            for version in vault.list_key_versions(&name).await? {
                let key = vault.get_key(&name, Some(&version)).await?;
                records.push(KeyRecord::from_vault_key(&key));
                on_diagnostic(Diagnostic::info(
                    Some(&name),
                    format!("Exported version: {}", version),
                ));
            }
        } else {
            let key = vault.get_key(&name, None).await?;
            records.push(KeyRecord::from_vault_key(&key));
        }
    }

    Ok(records)
}

/// Export the vault to `path`.
///
/// The file is written only after every record has been fetched.
pub async fn export_to_file<V, F>(
    vault: &V,
    path: &Path,
    options: &ExportOptions,
    mut on_diagnostic: F,
) -> Result<ExportReport>
where
    V: KeyVault + ?Sized,
    F: FnMut(Diagnostic),
{
    let records = export_records(vault, options, &mut on_diagnostic).await?;
    write_records(path, &records)?;

    let mut names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();

    on_diagnostic(Diagnostic::info(
        None,
        format!(
            "Export completed successfully. {} keys exported to {}",
            records.len(),
            path.display()
        ),
    ));

    Ok(ExportReport {
        records: records.len(),
        keys: names.len(),
        output: path.to_path_buf(),
    })
}
