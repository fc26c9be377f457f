//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! content-hash computation across the engine.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which serializes via
//! RFC 8785 (JSON Canonicalization Scheme): sorted keys, compact
//! separators, deterministic byte sequence. Any function computing an
//! offer content hash must accept `&CanonicalBytes`, so two offers with
//! the same content but different key ordering always hash identically.

use serde::Serialize;
use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JCS serialization failed.
    #[error("canonical serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Bytes produced exclusively by RFC 8785 canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `SerializationFailed` if the value cannot be serialized
    /// as canonical JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let bytes = serde_jcs::to_vec(obj)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_normalized() {
        let a = CanonicalBytes::new(&json!({"b": 2, "a": 1})).unwrap();
        let b = CanonicalBytes::new(&json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_objects_sorted() {
        let cb = CanonicalBytes::new(&json!({"z": {"y": 1, "x": 2}, "a": []})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":[],"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn test_empty_object() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert_eq!(cb.len(), 2);
        assert!(!cb.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_insertion_order_never_changes_bytes(
            entries in proptest::collection::btree_map("[a-z]{1,8}", 0i64..1000, 0..8)
        ) {
            let forward: serde_json::Map<String, serde_json::Value> =
                entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let reverse: serde_json::Map<String, serde_json::Value> =
                entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            let a = CanonicalBytes::new(&forward).unwrap();
            let b = CanonicalBytes::new(&reverse).unwrap();
            proptest::prop_assert_eq!(a, b);
        }
    }
}
