//! Vault import: reconcile every record of a key file against a vault.
//!
//! Records are processed one after the other. Per-record failures are tallied
//! and never stop the batch; only an unreadable or malformed file fails the
//! whole import.

pub mod reconcile;
pub mod types;

pub use reconcile::reconcile;
pub use types::{
    ImportEvent, ImportOptions, ImportOutcome, ImportSummary, PropertyUpdate, RecordError,
};

use futures::{Stream, StreamExt};
use std::path::Path;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::record::{read_records, KeyRecord};
use crate::vault::KeyVault;

/// Lazily reconcile `records`, yielding each record's diagnostics followed by
/// its outcome. Nothing touches the vault until the stream is polled.
///
/// Laziness is per record: polling runs one record's vault calls to completion,
/// then yields its buffered diagnostics and outcome before the next record
/// starts.
pub fn import_events<'a, V>(
    vault: &'a V,
    records: &'a [KeyRecord],
    options: ImportOptions,
) -> impl Stream<Item = ImportEvent> + 'a
where
    V: KeyVault + ?Sized,
{
    async_stream::stream! {
        for (index, record) in records.iter().enumerate() {
            let mut diagnostics = Vec::new();
            let outcome = reconcile(vault, record, &options, &mut diagnostics).await;
            for diagnostic in diagnostics {
                yield ImportEvent::Diagnostic(diagnostic);
            }
            yield ImportEvent::Record {
                index,
                name: record.name.clone(),
                outcome,
            };
        }
    }
}

/// Reconcile every record and return the batch tally.
pub async fn import_records<V, F>(
    vault: &V,
    records: &[KeyRecord],
    options: ImportOptions,
    mut on_event: F,
) -> ImportSummary
where
    V: KeyVault + ?Sized,
    F: FnMut(&ImportEvent),
{
    let mut summary = ImportSummary::default();
    let events = import_events(vault, records, options);
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        if let ImportEvent::Record { outcome, .. } = &event {
            summary.record(outcome);
        }
        on_event(&event);
    }

    summary
}

/// Read a key file and import it.
///
/// An empty file yields an all-zero summary.
pub async fn import_file<V, F>(
    vault: &V,
    path: &Path,
    options: ImportOptions,
    mut on_event: F,
) -> Result<ImportSummary>
where
    V: KeyVault + ?Sized,
    F: FnMut(&ImportEvent),
{
    let records = read_records(path).await?;

    if records.is_empty() {
        on_event(&ImportEvent::Diagnostic(Diagnostic::info(
            None,
            "No keys found in the import file.",
        )));
        return Ok(ImportSummary::default());
    }

    on_event(&ImportEvent::Diagnostic(Diagnostic::info(
        None,
        format!("Found {} keys in file.", records.len()),
    )));

    let summary = import_records(vault, &records, options, &mut on_event).await;

    on_event(&ImportEvent::Diagnostic(Diagnostic::info(
        None,
        format!("Import completed. Results: {}.", summary),
    )));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::InMemoryVault;

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let vault = InMemoryVault::new();
        let records = vec![KeyRecord {
            name: "k1".to_string(),
            key_type: "RSA".to_string(),
            ..Default::default()
        }];

        let events = import_events(&vault, &records, ImportOptions::default());
        assert!(vault.calls().is_empty());

        let collected: Vec<ImportEvent> = events.collect().await;
        assert!(!vault.calls().is_empty());
        assert!(matches!(
            collected.last(),
            Some(ImportEvent::Record { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_outcome_follows_its_diagnostics() {
        let vault = InMemoryVault::new();
        let records = vec![
            KeyRecord {
                name: String::new(),
                key_type: "RSA".to_string(),
                ..Default::default()
            },
            KeyRecord {
                name: "k2".to_string(),
                key_type: "oct".to_string(),
                ..Default::default()
            },
        ];

        let mut order = Vec::new();
        let summary = import_records(&vault, &records, ImportOptions::default(), |event| {
            order.push(match event {
                ImportEvent::Diagnostic(_) => "diag".to_string(),
                ImportEvent::Record { index, .. } => format!("record{}", index),
            })
        })
        .await;

        assert_eq!(summary.errored, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(order.first().map(String::as_str), Some("diag"));
        assert_eq!(order[1], "record0");
        assert_eq!(order.last().map(String::as_str), Some("record1"));
    }
}
