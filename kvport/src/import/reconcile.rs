//! Per-record import decision: skip, create, import material, or fail.

use crate::diagnostics::Diagnostic;
use crate::record::{JsonWebKey, KeyRecord, KeyType};
use crate::vault::KeyVault;

use super::types::{ImportOptions, ImportOutcome, PropertyUpdate, RecordError};

/// Reconcile one record against the vault.
///
/// Validation failures return before any vault call. An existing key is
/// skipped only with `skip_existing`; otherwise it is overwritten through the
/// create or material-import path. Never panics or aborts on vault errors:
/// every failure becomes [`ImportOutcome::Failed`].
pub async fn reconcile<V>(
    vault: &V,
    record: &KeyRecord,
    options: &ImportOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> ImportOutcome
where
    V: KeyVault + ?Sized,
{
    let name = record.name.as_str();
    if name.trim().is_empty() {
        return fail(diagnostics, None, RecordError::MissingName);
    }

    let key_type = match parse_key_type(record) {
        Ok(kt) => kt,
        Err(e) => return fail(diagnostics, Some(name), e),
    };

    let existing = match vault.key_exists(name).await {
        Ok(exists) => exists,
        Err(source) => {
            return fail(
                diagnostics,
                Some(name),
                RecordError::Lookup {
                    name: name.to_string(),
                    source,
                },
            )
        }
    };

    if existing {
        if options.skip_existing {
            diagnostics.push(Diagnostic::info(
                Some(name),
                format!("Skipping existing key: {}", name),
            ));
            return ImportOutcome::Skipped;
        }
        diagnostics.push(Diagnostic::warning(
            Some(name),
            format!("Key '{}' already exists. Will update properties.", name),
        ));
    }

    let outcome = match &record.key_parameters {
        None => {
            diagnostics.push(Diagnostic::warning(
                Some(name),
                format!(
                    "No key material found for key '{}'. Creating a new key instead.",
                    name
                ),
            ));
            match vault.create_key(name, key_type, &record.create_options()).await {
                Ok(_) => {
                    diagnostics.push(Diagnostic::info(
                        Some(name),
                        format!("Successfully created new key: {}", name),
                    ));
                    ImportOutcome::Created { existing }
                }
                Err(source) => {
                    return fail(
                        diagnostics,
                        Some(name),
                        RecordError::Create {
                            name: name.to_string(),
                            source,
                        },
                    )
                }
            }
        }
        Some(material) => {
            if !material.has_private_material() {
                diagnostics.push(Diagnostic::warning(
                    Some(name),
                    format!(
                        "No private key material for '{}'; the vault will likely reject it.",
                        name
                    ),
                ));
            }
            if let Some(declared) = material_type_mismatch(key_type, material) {
                diagnostics.push(Diagnostic::warning(
                    Some(name),
                    format!(
                        "Key '{}' is declared {} but its material says {}. Importing as {}.",
                        name, key_type, declared, key_type
                    ),
                ));
            }

            if let Err(source) = vault.import_key(name, material, key_type.is_hsm()).await {
                return fail(
                    diagnostics,
                    Some(name),
                    RecordError::Import {
                        name: name.to_string(),
                        source,
                    },
                );
            }

            let properties = match record.property_update() {
                None => PropertyUpdate::NotNeeded,
                Some(update) => match vault.update_key_properties(name, &update).await {
                    Ok(_) => {
                        diagnostics.push(Diagnostic::info(
                            Some(name),
                            format!("Updated properties for key: {}", name),
                        ));
                        PropertyUpdate::Applied
                    }
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            Some(name),
                            format!(
                                "Imported material for {} but updating its properties failed: {}",
                                name, e
                            ),
                        ));
                        PropertyUpdate::Failed(e.to_string())
                    }
                },
            };

            diagnostics.push(Diagnostic::info(
                Some(name),
                format!("Successfully imported key with material: {}", name),
            ));
            ImportOutcome::Imported {
                existing,
                properties,
            }
        }
    };

    if record.rotation_policy.is_some() {
        diagnostics.push(Diagnostic::info(
            Some(name),
            format!("Note: Rotation policy for {} needs to be set manually", name),
        ));
    }

    outcome
}

fn parse_key_type(record: &KeyRecord) -> Result<KeyType, RecordError> {
    if record.key_type.trim().is_empty() {
        return Err(RecordError::MissingKeyType {
            name: record.name.clone(),
        });
    }
    record
        .key_type
        .parse()
        .map_err(|_| RecordError::InvalidKeyType {
            name: record.name.clone(),
            key_type: record.key_type.clone(),
        })
}

/// The material's own `kty` when it names a different key type than the record.
fn material_type_mismatch(key_type: KeyType, material: &JsonWebKey) -> Option<String> {
    if material.kty.trim().is_empty() {
        return None;
    }
    match material.kty.parse::<KeyType>() {
        Ok(kty) if kty == key_type => None,
        _ => Some(material.kty.clone()),
    }
}

fn fail(diagnostics: &mut Vec<Diagnostic>, key: Option<&str>, error: RecordError) -> ImportOutcome {
    diagnostics.push(Diagnostic::error(key, error.to_string()));
    ImportOutcome::Failed(error)
}
