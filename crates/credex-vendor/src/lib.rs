//! # credex-vendor: Vendor Gateway
//!
//! The vendor is the issuer's/verifier's own backend, external to the
//! platform, contacted over webhook and pull APIs. This crate defines the
//! [`VendorGateway`] trait the engine programs against and ships the
//! production [`HttpVendorGateway`] built on `reqwest`.
//!
//! ## Contract Highlights
//!
//! - Offer pull: a `202` from the vendor means "still computing" and is
//!   surfaced as [`VendorOffersResponse::Pending`], never an error.
//! - Identify: a vendor `404` is a distinct [`VendorError::UserNotFound`]
//!   so the pipeline can translate it to its 401 outcome.
//! - Transport failures retry with bounded exponential backoff; HTTP
//!   error statuses never retry.
//!
//! ## Crate Policy
//!
//! - Depends on `credex-core` and `credex-exchange` internally.
//! - No engine business logic here; this crate moves bytes and maps
//!   status codes.

pub mod error;
pub mod gateway;
pub mod http;
mod retry;
pub mod types;

pub use error::VendorError;
pub use gateway::VendorGateway;
pub use http::HttpVendorGateway;
pub use types::{IdentificationPayload, IdentityResult, VendorOffersFilter, VendorOffersResponse};
