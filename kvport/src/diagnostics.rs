//! Structured diagnostics emitted while exporting and importing.
//!
//! Library code never prints; callers decide how to render these.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// One diagnostic event, tagged with the key it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: Level, key: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level,
            key: key.filter(|k| !k.is_empty()).map(|k| k.to_string()),
            message: message.into(),
        }
    }

    pub fn info(key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, key, message)
    }

    pub fn warning(key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, key, message)
    }

    pub fn error(key: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, key, message)
    }
}
