//! # credex-issuance: Credential Issuance Orchestration
//!
//! Takes a consented offer set through signing, per-offer atomic approval
//! with subresource-integrity digests, and the best-effort
//! issued-credentials webhook.
//!
//! Signing itself and credential-type metadata lookup are seams
//! (`CredentialSigner`, `CredentialTypeMetadataSource`): the embedding
//! service wires its KMS-backed signer and registrar client in.

pub mod orchestrator;
pub mod signer;

pub use orchestrator::IssuanceOrchestrator;
pub use signer::{
    CredentialSigner, CredentialTypeMetadataSource, IssuedCredential, IssuerDescriptor,
    KeyPurpose, SignerError,
};
