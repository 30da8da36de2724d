//! Export/import through the interchange file against in-memory vaults.

use chrono::{TimeZone, Utc};
use kvport::record::read_records;
use kvport::vault::{VaultCall, VaultOp};
use kvport::{
    export_to_file, import_file, import_records, ExportOptions, ImportEvent, ImportOptions,
    ImportSummary, InMemoryVault, JsonWebKey, KeyAttributes, KeyOperation, KeyRecord, KeyType,
    KeyVault, Level, VaultKey,
};
use std::collections::BTreeMap;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vault_key(name: &str, version: &str, kty: &str, tag: &str) -> VaultKey {
    let mut tags = BTreeMap::new();
    tags.insert("env".to_string(), tag.to_string());
    VaultKey {
        name: name.to_string(),
        version: Some(version.to_string()),
        key: JsonWebKey {
            kty: kty.to_string(),
            key_ops: vec![KeyOperation::Sign, KeyOperation::Verify],
            n: Some("sXch".to_string()),
            e: Some("AQAB".to_string()),
            ..Default::default()
        },
        attributes: KeyAttributes {
            enabled: Some(true),
            created: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            updated: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            expires_on: Some(Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap()),
            not_before: None,
            recovery_level: Some("Recoverable".to_string()),
            recoverable_days: Some(90),
        },
        tags,
    }
}

fn seeded_vault() -> InMemoryVault {
    InMemoryVault::new()
        .with_key(vault_key("signing", "v1", "RSA", "old"))
        .with_key(vault_key("signing", "v2", "RSA", "prod"))
        .with_key(vault_key("wrapping", "w1", "EC-HSM", "prod"))
}

fn tally(imported: usize, skipped: usize, errored: usize) -> ImportSummary {
    ImportSummary {
        imported,
        skipped,
        errored,
    }
}

async fn import_json(vault: &InMemoryVault, json: &str, skip: bool) -> ImportSummary {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, json).unwrap();

    import_file(vault, &path, ImportOptions { skip_existing: skip }, |_| {})
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_export_then_import_reproduces_keys() {
    let source = seeded_vault();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.json");

    let report = export_to_file(&source, &path, &ExportOptions::default(), |_| {})
        .await
        .unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.keys, 2);

    let exported = read_records(&path).await.unwrap();
    let names: Vec<&str> = exported.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["signing", "wrapping"]);

    let target = InMemoryVault::new();
    let summary = import_file(&target, &path, ImportOptions::default(), |_| {})
        .await
        .unwrap();
    assert_eq!(summary, tally(2, 0, 0));

    for record in &exported {
        let key = target.latest(&record.name).unwrap();
        assert_eq!(key.key.kty, record.key_type);
        assert_eq!(key.tags, record.tags);
        assert_eq!(key.attributes.enabled, record.enabled);
        assert_eq!(key.attributes.expires_on, record.expires_on);
    }

    // Material import followed by one property update per record
    let ops: Vec<VaultOp> = target.mutations().iter().map(VaultCall::op).collect();
    assert_eq!(
        ops,
        vec![
            VaultOp::ImportKey,
            VaultOp::UpdateProperties,
            VaultOp::ImportKey,
            VaultOp::UpdateProperties,
        ]
    );
}

#[tokio::test]
async fn test_imported_record_equals_file_record() {
    let source = seeded_vault();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.json");
    export_to_file(&source, &path, &ExportOptions { include_all_versions: true }, |_| {})
        .await
        .unwrap();

    let from_file = read_records(&path).await.unwrap();
    assert_eq!(from_file.len(), 3);

    let expected: Vec<KeyRecord> = source
        .key_names()
        .iter()
        .flat_map(|n| source.versions(n))
        .map(|k| KeyRecord::from_vault_key(&k))
        .collect();
    assert_eq!(from_file, expected);

    let target = InMemoryVault::new();
    let mut handed = Vec::new();
    import_records(&target, &from_file, ImportOptions::default(), |_| {}).await;
    for call in target.mutations() {
        if let VaultCall::ImportKey { key, .. } = call {
            handed.push(key);
        }
    }
    let file_keys: Vec<JsonWebKey> = from_file
        .iter()
        .map(|r| r.key_parameters.clone().unwrap())
        .collect();
    assert_eq!(handed, file_keys);
}

// ---------------------------------------------------------------------------
// Import scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_single_new_key_is_created() {
    let vault = InMemoryVault::new();
    let summary = import_json(&vault, r#"[{"name":"k1","keyType":"RSA"}]"#, false).await;

    assert_eq!(summary, tally(1, 0, 0));
    let ops: Vec<VaultOp> = vault.mutations().iter().map(VaultCall::op).collect();
    assert_eq!(ops, vec![VaultOp::CreateKey]);
    assert_eq!(vault.latest("k1").unwrap().key.kty, KeyType::Rsa.as_str());
}

#[tokio::test]
async fn test_empty_name_makes_no_vault_call() {
    let vault = InMemoryVault::new();
    let summary = import_json(&vault, r#"[{"name":"","keyType":"RSA"}]"#, false).await;

    assert_eq!(summary, tally(0, 0, 1));
    assert!(vault.calls().is_empty());
}

#[tokio::test]
async fn test_bogus_key_type_is_error() {
    let vault = InMemoryVault::new();
    let summary = import_json(&vault, r#"[{"name":"k1","keyType":"BOGUS"}]"#, false).await;

    assert_eq!(summary.errored, 1);
    assert!(vault.mutations().is_empty());
}

#[tokio::test]
async fn test_skip_existing_leaves_vault_alone() {
    let vault = seeded_vault();
    let json = r#"[{"name":"signing","keyType":"RSA"},{"name":"fresh","keyType":"EC"}]"#;
    let summary = import_json(&vault, json, true).await;

    assert_eq!(summary, tally(1, 1, 0));
    assert_eq!(vault.versions("signing").len(), 2);
    assert!(vault.latest("fresh").is_some());
}

#[tokio::test]
async fn test_mixed_batch_keeps_going() {
    let vault = InMemoryVault::new();
    vault.fail_on(VaultOp::CreateKey, Some("broken"));
    let json = r#"[
        {"name":"a","keyType":"oct"},
        {"NAME":"","KEYTYPE":"RSA"},
        {"name":"broken","keyType":"RSA"},
        {"name":"b","keytype":"ec-hsm"}
    ]"#;
    let summary = import_json(&vault, json, false).await;

    assert_eq!(summary, tally(2, 0, 2));
    assert_eq!(summary.total(), 4);
    assert_eq!(vault.key_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_empty_array_yields_zero_tally() {
    let vault = InMemoryVault::new();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, "[]").unwrap();

    let mut infos = Vec::new();
    let summary = import_file(&vault, &path, ImportOptions::default(), |e| {
        if let ImportEvent::Diagnostic(d) = e {
            infos.push((d.level, d.message.clone()));
        }
    })
    .await
    .unwrap();

    assert_eq!(summary, ImportSummary::default());
    assert_eq!(
        infos,
        vec![(Level::Info, "No keys found in the import file.".to_string())]
    );
    assert!(vault.calls().is_empty());
}

#[tokio::test]
async fn test_unreadable_file_is_top_level_error() {
    let vault = InMemoryVault::new();
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.json");
    assert!(import_file(&vault, &missing, ImportOptions::default(), |_| {})
        .await
        .is_err());

    let not_array = dir.path().join("object.json");
    std::fs::write(&not_array, r#"{"name":"k1"}"#).unwrap();
    assert!(import_file(&vault, &not_array, ImportOptions::default(), |_| {})
        .await
        .is_err());

    assert!(vault.calls().is_empty());
}

#[tokio::test]
async fn test_outcomes_line_up_with_records() {
    let vault = InMemoryVault::new().with_key(vault_key("taken", "t1", "RSA", "x"));
    let records: Vec<KeyRecord> = serde_json::from_str(
        r#"[{"name":"taken","keyType":"RSA"},{"name":"new","keyType":"RSA"}]"#,
    )
    .unwrap();

    let mut outcomes = Vec::new();
    import_records(&vault, &records, ImportOptions { skip_existing: true }, |e| {
        if let ImportEvent::Record { index, outcome, .. } = e {
            outcomes.push((*index, outcome.is_skipped(), outcome.is_imported()));
        }
    })
    .await;

    assert_eq!(outcomes, vec![(0, true, false), (1, false, true)]);
    assert!(vault.key_exists("new").await.unwrap());
    assert!(matches!(
        vault.calls().first(),
        Some(VaultCall::GetKey { name, .. }) if name == "taken"
    ));
}
