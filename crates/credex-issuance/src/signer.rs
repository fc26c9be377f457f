//! # Signing and Metadata Seams
//!
//! The orchestrator delegates JWT-VC signing and credential-type metadata
//! lookup through these traits. Production implementations live with the
//! embedding service (KMS-backed signer, registrar client); tests supply
//! in-process substitutes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use credex_core::{CredexError, Did, TenantId};
use credex_offer::Offer;

/// Purpose a tenant signing key is provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyPurpose {
    /// Signing issued credentials.
    Issuing,
    /// Signing exchange-level proofs.
    Exchanges,
    /// Signing DLT transactions.
    DltTransactions,
}

/// Everything the signer needs to know about the issuing tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerDescriptor {
    /// The issuing tenant.
    pub tenant_id: TenantId,
    /// The tenant's DID.
    pub tenant_did: Did,
    /// KMS key id of the issuing key.
    pub issuing_kms_key_id: String,
    /// DID-document key reference of the issuing key, e.g. `#key-1`.
    pub issuing_did_key_ref: String,
    /// KMS key id used for DLT transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlt_kms_key_id: Option<String>,
    /// DLT operator address issuing on behalf of the tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlt_operator_address: Option<String>,
    /// The tenant's primary on-chain address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_address: Option<String>,
}

/// Signer failure modes.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The tenant is not permitted to issue this credential category.
    #[error("not permitted to issue {category}")]
    NotPermitted {
        /// Credential category the tenant lacks permission for.
        category: String,
    },

    /// Any other signing failure.
    #[error("signing failed: {0}")]
    Other(String),
}

/// One signed credential with the DID the signer assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// The signed JWT-VC string.
    pub jwt: String,
    /// DID assigned to the credential.
    pub did: Did,
}

/// Signs offers into JWT verifiable credentials.
#[async_trait]
pub trait CredentialSigner: Send + Sync {
    /// Sign each offer into a JWT-VC for `subject_id`.
    ///
    /// The returned list is index-aligned with `offers`. Per-type
    /// issuance rules come from `type_metadata`, keyed by credential type
    /// name.
    async fn issue_credentials(
        &self,
        offers: &[Offer],
        subject_id: &Did,
        type_metadata: &HashMap<String, Value>,
        issuer: &IssuerDescriptor,
    ) -> Result<Vec<IssuedCredential>, SignerError>;
}

/// Registrar-backed credential-type metadata lookup.
#[async_trait]
pub trait CredentialTypeMetadataSource: Send + Sync {
    /// Metadata for each requested type, keyed by type name.
    async fn get_credential_type_metadata(
        &self,
        credential_types: &[String],
    ) -> Result<HashMap<String, Value>, CredexError>;
}
