//! # Content and Integrity Digests
//!
//! Two digest forms back the engine's idempotency and audit guarantees:
//!
//! - [`ContentHash`]: SHA-256 over canonical offer content, rendered as
//!   lowercase hex. This is the offer de-duplication key; identical content
//!   must never be issued twice into the same exchange.
//! - [`SriDigest`]: a subresource-integrity digest (`sha384-<base64>`) of a
//!   signed JWT credential, persisted at approval time so a verifier can
//!   later prove the stored credential is byte-identical to what was issued.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384};

use crate::canonical::CanonicalBytes;

/// SHA-256 content hash used as the offer de-duplication key.
///
/// Produced exclusively from `CanonicalBytes`, so hash equality is content
/// equality regardless of JSON key ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Access the lowercase hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a previously computed hex digest (e.g. loaded from storage or
    /// supplied by a caller as an already-seen hash).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 content hash of canonical bytes.
pub fn content_hash(data: &CanonicalBytes) -> ContentHash {
    let hash = Sha256::digest(data.as_bytes());
    ContentHash(hash.iter().map(|b| format!("{b:02x}")).collect())
}

/// Subresource-integrity digest of an issued JWT credential.
///
/// Rendered in SRI form: `sha384-<standard base64 of the SHA-384 hash>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SriDigest(String);

impl SriDigest {
    /// Compute the SRI digest of a signed JWT string.
    pub fn compute(jwt: &str) -> Self {
        let hash = Sha384::digest(jwt.as_bytes());
        Self(format!("sha384-{}", BASE64.encode(hash)))
    }

    /// Recompute the digest of `jwt` and compare against this one.
    pub fn matches(&self, jwt: &str) -> bool {
        Self::compute(jwt) == *self
    }

    /// Access the full `sha384-...` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SriDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_deterministic() {
        let cb = CanonicalBytes::new(&json!({"type": ["EmailV1.0"], "email": "a@x.com"})).unwrap();
        assert_eq!(content_hash(&cb), content_hash(&cb));
    }

    #[test]
    fn test_content_hash_ignores_key_order() {
        let a = CanonicalBytes::new(&json!({"a": 1, "b": 2})).unwrap();
        let b = CanonicalBytes::new(&json!({"b": 2, "a": 1})).unwrap();
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_content_hash_is_hex() {
        let cb = CanonicalBytes::new(&json!({"k": "v"})).unwrap();
        let h = content_hash(&cb);
        assert_eq!(h.as_str().len(), 64);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_sha256_vector() {
        // SHA256("{}") verified against an independent implementation.
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(
            content_hash(&cb).as_str(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_sri_digest_prefix_and_roundtrip() {
        let jwt = "eyJhbGciOiJFUzI1NksifQ.eyJzdWIiOiJob2xkZXIifQ.c2ln";
        let digest = SriDigest::compute(jwt);
        assert!(digest.as_str().starts_with("sha384-"));
        assert!(digest.matches(jwt));
        assert!(!digest.matches("tampered"));
    }

    #[test]
    fn test_sri_digest_distinct_inputs() {
        assert_ne!(SriDigest::compute("a.b.c"), SriDigest::compute("a.b.d"));
    }
}
