//! # credex-presentation
//!
//! Presentation intake for the Credex engine: decode the presented
//! credential JWTs, run the verification seam, resolve the holder's
//! identity against the vendor or stored matcher values, and drive the
//! exchange to its disclosure-side outcome.
//!
//! The pipeline owns the at-most-once presentation claim and the
//! disclosure-side state transitions; cryptographic verification and
//! user persistence sit behind the [`CredentialVerifier`] and
//! [`UserStore`] seams.

pub mod identity;
pub mod jwt;
pub mod pipeline;
pub mod user;
pub mod verifier;

pub use identity::{eval_rule, extract_path, match_identity};
pub use jwt::{decode_claims, decode_credential};
pub use pipeline::{PresentationPipeline, PresentationReceipt, PresentationSubmission};
pub use user::{MemoryUserStore, PlatformUser, UserStore};
pub use verifier::{CheckResult, CheckedCredential, CredentialChecks, CredentialVerifier};
