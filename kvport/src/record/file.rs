//! Reading and writing the interchange file: a JSON array of key records.

use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

use super::types::{KeyRecord, RECORD_FIELDS};
use crate::error::{Error, Result};

/// Parse the contents of a key file.
///
/// Record field names are matched case-insensitively (`NAME`, `keytype`, ...).
pub fn parse_records(json: &str) -> Result<Vec<KeyRecord>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(Error::InvalidFile(
            "expected a JSON array of key records".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => {
                let normalized = Value::Object(normalize_field_names(fields));
                serde_json::from_value(normalized).map_err(|e| {
                    Error::InvalidFile(format!("record {}: {}", index, e))
                })
            }
            other => Err(Error::InvalidFile(format!(
                "record {} is not an object (found {})",
                index,
                value_kind(&other)
            ))),
        })
        .collect()
}

/// Read and parse a key file.
pub async fn read_records(path: &Path) -> Result<Vec<KeyRecord>> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_records(&json)
}

/// Serialize records as pretty-printed JSON and persist them at `path`.
///
/// The file only appears once it has been written completely; on failure the
/// destination is left untouched.
pub fn write_records(path: &Path, records: &[KeyRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}

fn normalize_field_names(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let canonical = RECORD_FIELDS
                .iter()
                .find(|f| f.eq_ignore_ascii_case(&key))
                .map(|f| f.to_string())
                .unwrap_or(key);
            (canonical, value)
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::KeyOperation;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_record() {
        let records = parse_records(r#"[{"name":"k1","keyType":"RSA"}]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "k1");
        assert_eq!(records[0].key_type, "RSA");
        assert!(records[0].key_parameters.is_none());
    }

    #[test]
    fn test_parse_case_insensitive_fields() {
        let records = parse_records(
            r#"[{"NAME":"k1","KeyType":"EC","KEYOPERATIONS":["sign"],"Tags":{"a":"b"},"expireson":"2030-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let record = &records[0];
        assert_eq!(record.name, "k1");
        assert_eq!(record.key_type, "EC");
        assert_eq!(record.key_operations, vec![KeyOperation::Sign]);
        assert_eq!(record.tags.get("a").map(String::as_str), Some("b"));
        assert!(record.expires_on.is_some());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse_records(r#"{"name":"k1"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidFile(_)));
    }

    #[test]
    fn test_parse_rejects_non_object_entry() {
        let err = parse_records(r#"[{"name":"k1","keyType":"RSA"}, 42]"#).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(parse_records("[{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_unknown_key_type_still_parses() {
        let records = parse_records(r#"[{"name":"k1","keyType":"BOGUS"}]"#).unwrap();
        assert_eq!(records[0].key_type, "BOGUS");
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keys.json");
        let records = vec![KeyRecord {
            name: "k1".to_string(),
            key_type: "RSA".to_string(),
            enabled: Some(true),
            ..Default::default()
        }];

        write_records(&path, &records).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  {"), "output should be pretty-printed");
        assert!(!written.contains("null"));
        assert_eq!(parse_records(&written).unwrap(), records);
    }

    #[test]
    fn test_write_into_missing_dir_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("keys.json");
        assert!(write_records(&path, &[]).is_err());
        assert!(!path.exists());
    }
}
