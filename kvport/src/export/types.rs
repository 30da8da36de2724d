//! Export options and results.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Emit one record per version instead of one per key
    pub include_all_versions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Records written
    pub records: usize,
    /// Distinct key names
    pub keys: usize,
    pub output: PathBuf,
}
