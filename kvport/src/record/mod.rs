//! The interchange model: one [`KeyRecord`] per exported key version.

pub mod file;
pub mod jwk;
pub mod key_type;
pub mod types;

pub use file::{parse_records, read_records, write_records};
pub use jwk::JsonWebKey;
pub use key_type::{KeyOperation, KeyType};
pub use types::KeyRecord;
