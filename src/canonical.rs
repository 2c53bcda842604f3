//! Content fingerprints.
//!
//! Every id the kernel derives (extraction cache keys, the base-language
//! fingerprint, `export_hash`, `book_id`) is an xxh64 [`Fingerprint`] rendered
//! as 16 lowercase hex digits.
//!
//! | Input | Function | Used for |
//! |-------|----------|----------|
//! | serializable value | [`canonical_hash_hex`] | book id, policy hash, base fingerprint |
//! | raw file bytes | [`content_hash_hex`] | export identity |
//!
//! Values are hashed through their JSON form, so anything hashed must keep a
//! stable shape: struct fields in declaration order, `Vec`s in index order and
//! `BTreeMap` (never `HashMap`) for keyed data.

use std::fmt;

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

const SEED: u64 = 0;

/// 64-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Digest of raw bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(xxh64(bytes, SEED))
    }

    /// Digest of a value's canonical JSON form.
    pub fn of<T: Serialize>(value: &T) -> Self {
        Self::of_bytes(&to_canonical_bytes(value))
    }

    /// Raw digest.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Canonical JSON bytes of a value.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    // Only maps with non-string keys can fail here; hashed types use string keys.
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Hex fingerprint of a serializable value.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    Fingerprint::of(value).to_string()
}

/// Hex fingerprint of raw document bytes.
pub fn content_hash_hex(bytes: &[u8]) -> String {
    Fingerprint::of_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Chapter {
        number: u32,
        title: &'static str,
    }

    #[test]
    fn test_value_fingerprint_is_stable() {
        let chapter = Chapter { number: 1, title: "Arrival" };
        assert_eq!(canonical_hash_hex(&chapter), canonical_hash_hex(&Chapter { number: 1, title: "Arrival" }));
        assert_ne!(canonical_hash_hex(&chapter), canonical_hash_hex(&Chapter { number: 2, title: "Arrival" }));
    }

    #[test]
    fn test_map_order_does_not_matter() {
        let a: BTreeMap<&str, &str> = [("DLG_2", "Bye"), ("DLG_1", "Hi")].into();
        let b: BTreeMap<&str, &str> = [("DLG_1", "Hi"), ("DLG_2", "Bye")].into();
        assert_eq!(canonical_hash_hex(&a), canonical_hash_hex(&b));
    }

    #[test]
    fn test_value_hash_is_hash_of_its_json() {
        let chapter = Chapter { number: 3, title: "Home" };
        let json = br#"{"number":3,"title":"Home"}"#;
        assert_eq!(canonical_hash_hex(&chapter), content_hash_hex(json));
    }

    #[test]
    fn test_hex_is_zero_padded() {
        assert_eq!(Fingerprint(0xab).to_string(), "00000000000000ab");
        assert_eq!(content_hash_hex(b"export").len(), 16);
    }
}
