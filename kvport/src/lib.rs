//! kvport: move Key Vault keys through a portable JSON file
//!
//! - [`export`] walks a vault and writes one [`KeyRecord`] per key (or per version)
//! - [`import`] reads records back and reconciles each one against a vault
//!
//! Vault access goes through the [`KeyVault`] trait; [`RestVault`] talks to the
//! Key Vault data plane and [`InMemoryVault`] backs tests.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod import;
pub mod record;
pub mod vault;

pub use config::Config;
pub use diagnostics::{Diagnostic, Level};
pub use error::{Error, Result};
pub use export::{export_records, export_to_file, ExportOptions, ExportReport};
pub use import::{
    import_events, import_file, import_records, ImportEvent, ImportOptions, ImportOutcome,
    ImportSummary, PropertyUpdate, RecordError,
};
pub use record::{JsonWebKey, KeyOperation, KeyRecord, KeyType};
pub use vault::{
    CreateKeyOptions, InMemoryVault, KeyAttributes, KeyPropertiesUpdate, KeyVault, RestVault,
    VaultError, VaultKey,
};
