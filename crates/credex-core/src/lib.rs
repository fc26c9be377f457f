//! # credex-core: Foundational Types for the Credex Exchange Engine
//!
//! This crate is the bedrock of the Credex workspace. Every other crate
//! depends on `credex-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** `ExchangeId`, `TenantId`,
//!    `DisclosureId`, `OfferId`, `Did`, `VendorUserId`. No bare strings or
//!    UUIDs cross a crate boundary.
//!
//! 2. **`CanonicalBytes` newtype.** All content-hash computation flows
//!    through `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for
//!    digests, which would make hash equality depend on key ordering.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision.
//!
//! 4. **Explicit configuration.** `EngineConfig` is constructed once and
//!    passed by reference into each component entry point. No ambient
//!    global flags.
//!
//! 5. **One error taxonomy.** `CredexError` carries an HTTP-equivalent
//!    status, a machine-readable code, and (where the outcome is durable)
//!    the exchange error state to record before propagation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credex-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use config::{DeepLinkConfig, EngineConfig, OfferMode};
pub use digest::{content_hash, ContentHash, SriDigest};
pub use error::{codes, CredexError};
pub use identity::{Did, DisclosureId, ExchangeId, OfferId, TenantId, UserId, VendorUserId};
pub use temporal::Timestamp;
