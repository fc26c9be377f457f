//! # credex-schema: Schema Validation
//!
//! Runtime JSON Schema validation (Draft 2020-12) for the exchange engine.
//!
//! Two schema families live here:
//!
//! - The **vendor-offer schema**, embedded in the crate, validating the
//!   shape of offers a vendor submits over the pull or webhook paths.
//! - **Credential-type subject schemas**, registered at runtime from the
//!   credential-type registry, validating `credentialSubject` content per
//!   credential type.
//!
//! ## Crate Policy
//!
//! Schema validation is a trust boundary: invalid documents are rejected
//! with structured errors listing every violation with its instance path.
//! Platform-internal fields (notably `vendorUserId`) are stripped by the
//! caller before subject validation; this crate validates exactly what it
//! is given.

pub mod registry;

pub use registry::{SchemaError, SchemaRegistry, Violation};
