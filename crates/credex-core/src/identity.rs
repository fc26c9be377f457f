//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the exchange engine.
//! These prevent accidental identifier confusion: you cannot pass an
//! `OfferId` where an `ExchangeId` is expected.
//!
//! Exchange, tenant, and disclosure ids are platform-generated UUIDs.
//! Offer ids are vendor-supplied correlation strings and stay opaque.
//! DIDs and vendor user ids are likewise opaque strings owned by external
//! systems.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one wallet interaction (the exchange aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub Uuid);

/// Unique identifier of a tenant (an issuer or verifier organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

/// Unique identifier of a disclosure (issuing/inspection policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisclosureId(pub Uuid);

/// Unique identifier of a platform-internal user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Vendor-supplied offer correlation id. Opaque to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

/// A Decentralized Identifier, e.g. `did:ion:abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Did(pub String);

/// The vendor's own identifier for a holder, e.g. an email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorUserId(pub String);

macro_rules! impl_uuid_id {
    ($name:ident) => {
        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_uuid_id!(ExchangeId);
impl_uuid_id!(TenantId);
impl_uuid_id!(DisclosureId);
impl_uuid_id!(UserId);

macro_rules! impl_string_id {
    ($name:ident) => {
        impl $name {
            /// Wrap an externally supplied identifier string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Access the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

impl_string_id!(OfferId);
impl_string_id!(Did);
impl_string_id!(VendorUserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_ids_are_unique() {
        assert_ne!(ExchangeId::new(), ExchangeId::new());
        assert_ne!(TenantId::new(), TenantId::new());
    }

    #[test]
    fn test_string_id_roundtrip() {
        let id = OfferId::new("vendor-offer-42");
        assert_eq!(id.as_str(), "vendor-offer-42");
        assert_eq!(id.to_string(), "vendor-offer-42");
    }

    #[test]
    fn test_did_serde_is_bare_string() {
        let did = Did::new("did:ion:abc");
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, "\"did:ion:abc\"");
        let parsed: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, did);
    }

    #[test]
    fn test_exchange_id_serde_is_bare_uuid() {
        let id = ExchangeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ExchangeId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
