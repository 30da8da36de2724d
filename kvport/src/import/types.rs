//! Import options, per-record outcomes and batch tallies.

use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::record::key_type::VALID_KEY_TYPES;
use crate::vault::VaultError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Leave keys that already exist in the vault untouched
    pub skip_existing: bool,
}

/// Why a single record could not be imported.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Key name is missing in import file")]
    MissingName,

    #[error("Key type is missing for key '{name}'")]
    MissingKeyType { name: String },

    #[error("Invalid key type '{key_type}' for key '{name}'. Valid types are: {}", VALID_KEY_TYPES)]
    InvalidKeyType { name: String, key_type: String },

    #[error("Failed to look up key '{name}': {source}")]
    Lookup { name: String, source: VaultError },

    #[error("Failed to create key '{name}': {source}")]
    Create { name: String, source: VaultError },

    #[error("Error importing key {name} with material: {source}")]
    Import { name: String, source: VaultError },
}

/// Result of the property update that follows a material import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyUpdate {
    /// Record set none of enabled/expiry/activation/tags
    NotNeeded,
    Applied,
    /// Material is imported; the update failed with this message
    Failed(String),
}

/// What happened to one record.
#[derive(Debug)]
pub enum ImportOutcome {
    /// New key generated because the record carried no material
    Created { existing: bool },
    /// Key material imported
    Imported {
        existing: bool,
        properties: PropertyUpdate,
    },
    /// Key already existed and `skip_existing` was set
    Skipped,
    Failed(RecordError),
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Created { .. } | ImportOutcome::Imported { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ImportOutcome::Skipped)
    }
}

/// Batch tally: `imported + skipped + errored` equals the records processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl ImportSummary {
    pub fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Created { .. } | ImportOutcome::Imported { .. } => self.imported += 1,
            ImportOutcome::Skipped => self.skipped += 1,
            ImportOutcome::Failed(_) => self.errored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.errored
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} imported, {} skipped, {} errors",
            self.imported, self.skipped, self.errored
        )
    }
}

/// Item of the import event stream.
#[derive(Debug)]
pub enum ImportEvent {
    Diagnostic(Diagnostic),
    /// Final outcome for the record at `index` in the input
    Record {
        index: usize,
        name: String,
        outcome: ImportOutcome,
    },
}
