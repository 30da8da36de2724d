use serde::{Deserialize, Serialize};

/// Key types accepted by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyType {
    Ec,
    EcHsm,
    Rsa,
    RsaHsm,
    Oct,
    OctHsm,
}

pub const VALID_KEY_TYPES: &str = "EC, EC-HSM, RSA, RSA-HSM, Oct, Oct-HSM";

impl KeyType {
    pub const ALL: [KeyType; 6] = [
        KeyType::Ec,
        KeyType::EcHsm,
        KeyType::Rsa,
        KeyType::RsaHsm,
        KeyType::Oct,
        KeyType::OctHsm,
    ];

    /// Wire spelling used by the vault data plane.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ec => "EC",
            KeyType::EcHsm => "EC-HSM",
            KeyType::Rsa => "RSA",
            KeyType::RsaHsm => "RSA-HSM",
            KeyType::Oct => "oct",
            KeyType::OctHsm => "oct-HSM",
        }
    }

    pub fn is_hsm(&self) -> bool {
        matches!(self, KeyType::EcHsm | KeyType::RsaHsm | KeyType::OctHsm)
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        KeyType::ALL
            .into_iter()
            .find(|kt| kt.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Invalid key type '{}'. Valid types are: {}",
                    s, VALID_KEY_TYPES
                )
            })
    }
}

impl TryFrom<String> for KeyType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyType> for String {
    fn from(kt: KeyType) -> Self {
        kt.as_str().to_string()
    }
}

/// Operation tags a key may be used for.
///
/// Unknown tags are kept verbatim so that a newer vault's operations survive
/// an export/import round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    WrapKey,
    UnwrapKey,
    Import,
    Export,
    Other(String),
}

impl KeyOperation {
    pub fn as_str(&self) -> &str {
        match self {
            KeyOperation::Encrypt => "encrypt",
            KeyOperation::Decrypt => "decrypt",
            KeyOperation::Sign => "sign",
            KeyOperation::Verify => "verify",
            KeyOperation::WrapKey => "wrapKey",
            KeyOperation::UnwrapKey => "unwrapKey",
            KeyOperation::Import => "import",
            KeyOperation::Export => "export",
            KeyOperation::Other(s) => s,
        }
    }
}

impl std::fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for KeyOperation {
    fn from(s: String) -> Self {
        match s.as_str() {
            "encrypt" => KeyOperation::Encrypt,
            "decrypt" => KeyOperation::Decrypt,
            "sign" => KeyOperation::Sign,
            "verify" => KeyOperation::Verify,
            "wrapKey" => KeyOperation::WrapKey,
            "unwrapKey" => KeyOperation::UnwrapKey,
            "import" => KeyOperation::Import,
            "export" => KeyOperation::Export,
            _ => KeyOperation::Other(s),
        }
    }
}

impl From<&str> for KeyOperation {
    fn from(s: &str) -> Self {
        KeyOperation::from(s.to_string())
    }
}

impl From<KeyOperation> for String {
    fn from(op: KeyOperation) -> Self {
        match op {
            KeyOperation::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// Deduplicate operations, keeping the first occurrence of each.
pub fn dedup_operations(ops: &[KeyOperation]) -> Vec<KeyOperation> {
    let mut out: Vec<KeyOperation> = Vec::with_capacity(ops.len());
    for op in ops {
        if !out.contains(op) {
            out.push(op.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_parse_case_insensitive() {
        assert_eq!("RSA".parse::<KeyType>().unwrap(), KeyType::Rsa);
        assert_eq!("ec-hsm".parse::<KeyType>().unwrap(), KeyType::EcHsm);
        assert_eq!("Oct".parse::<KeyType>().unwrap(), KeyType::Oct);
        assert_eq!("oct-HSM".parse::<KeyType>().unwrap(), KeyType::OctHsm);
    }

    #[test]
    fn test_key_type_rejects_unknown() {
        let err = "BOGUS".parse::<KeyType>().unwrap_err();
        assert!(err.contains("BOGUS"));
        assert!(err.contains("RSA-HSM"));
        assert!("".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_key_type_display_uses_wire_spelling() {
        assert_eq!(KeyType::Oct.to_string(), "oct");
        assert_eq!(KeyType::RsaHsm.to_string(), "RSA-HSM");
        assert!(KeyType::OctHsm.is_hsm());
        assert!(!KeyType::Ec.is_hsm());
    }

    #[test]
    fn test_key_operation_unknown_survives() {
        let op: KeyOperation = serde_json::from_str("\"derive\"").unwrap();
        assert_eq!(op, KeyOperation::Other("derive".to_string()));
        assert_eq!(serde_json::to_string(&op).unwrap(), "\"derive\"");

        let op: KeyOperation = serde_json::from_str("\"wrapKey\"").unwrap();
        assert_eq!(op, KeyOperation::WrapKey);
    }

    #[test]
    fn test_dedup_operations_keeps_order() {
        let ops = vec![
            KeyOperation::Sign,
            KeyOperation::Verify,
            KeyOperation::Sign,
            KeyOperation::Encrypt,
            KeyOperation::Verify,
        ];
        assert_eq!(
            dedup_operations(&ops),
            vec![KeyOperation::Sign, KeyOperation::Verify, KeyOperation::Encrypt]
        );
    }
}
