//! # The Offer Document
//!
//! A candidate or finalized unit of credential content. Created when a
//! vendor batch or pre-loaded set presents candidates; mutated once at
//! approval (sets `did`, subject snapshot, consent timestamp, digest);
//! never physically deleted by the engine.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use credex_core::{
    codes, content_hash, CanonicalBytes, ContentHash, CredexError, Did, ExchangeId, OfferId,
    SriDigest, TenantId, Timestamp,
};

/// Subject field carrying the vendor's holder identifier. Platform
/// internal; stripped before subject-schema validation and excluded from
/// the content hash.
pub const VENDOR_USER_ID_FIELD: &str = "vendorUserId";

/// Offer issuer: either a bare DID string or the branded projection.
///
/// Which form is stored is a tenant policy
/// ([`EngineConfig::store_issuer_as_string`]); both forms are accepted on
/// the wire.
///
/// [`EngineConfig::store_issuer_as_string`]: credex_core::EngineConfig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OfferIssuer {
    /// Bare DID string.
    Did(Did),
    /// Branded issuer projection.
    #[serde(rename_all = "camelCase")]
    Detailed {
        /// Issuer DID.
        id: Did,
        /// Commercial entity name shown to the holder.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Commercial entity logo URL.
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        /// Issuer entity category.
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        entity_type: Option<String>,
    },
}

impl OfferIssuer {
    /// The issuer DID, whichever form is stored.
    pub fn id(&self) -> &Did {
        match self {
            Self::Did(did) => did,
            Self::Detailed { id, .. } => id,
        }
    }

    /// Commercial entity name, when the branded form carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Did(_) => None,
            Self::Detailed { name, .. } => name.as_deref(),
        }
    }

    /// Commercial entity logo, when the branded form carries one.
    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Did(_) => None,
            Self::Detailed { image, .. } => image.as_deref(),
        }
    }

    /// Apply the tenant's storage policy: collapse to a bare DID string
    /// or keep the `{id, name, image, type}` projection.
    pub fn normalize(self, store_as_string: bool) -> Self {
        if store_as_string {
            Self::Did(self.id().clone())
        } else {
            match self {
                Self::Did(did) => {
                    Self::Detailed { id: did, name: None, image: None, entity_type: None }
                }
                detailed @ Self::Detailed { .. } => detailed,
            }
        }
    }
}

/// Reference from an offer to a related offer, possibly superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCredential {
    /// The related offer.
    pub linked_offer_id: OfferId,
    /// Relationship kind, e.g. `REPLACE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    /// Set when the link was superseded; invalidated links are stripped
    /// before issuance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_at: Option<Timestamp>,
}

/// Fields recorded on an offer when it is approved at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferApproval {
    /// DID assigned to the issued credential.
    pub did: Did,
    /// Snapshot of the issued VC's credential subject.
    pub credential_subject: Map<String, Value>,
    /// When the holder consented.
    pub consented_at: Timestamp,
    /// Subresource-integrity digest of the signed JWT.
    pub digest: SriDigest,
}

/// A candidate or finalized unit of credential content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Vendor-supplied correlation id.
    pub offer_id: OfferId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Exchange this offer is bound to. Pre-loaded offers are created
    /// before any exchange exists and stay unbound until loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<ExchangeId>,
    /// Credential type array.
    #[serde(rename = "type")]
    pub credential_types: Vec<String>,
    /// Credential subject, with the embedded `vendorUserId`.
    pub credential_subject: Map<String, Value>,
    /// Issuer in the tenant's configured storage form.
    pub issuer: OfferIssuer,
    /// De-duplication key over the offer's credential content.
    pub content_hash: ContentHash,
    /// References to related offers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_credentials: Option<Vec<LinkedCredential>>,
    /// Credential expiry (mutually exclusive with `valid_until`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Timestamp>,
    /// Credential expiry (mutually exclusive with `expiration_date`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    /// Revocation pointer, assigned by the issuance layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<Value>,
    /// DID of the issued credential. Set once, at approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<Did>,
    /// When the holder consented. Set at approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consented_at: Option<Timestamp>,
    /// SRI digest of the issued JWT. Set at approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<SriDigest>,
    /// When the offer was created.
    pub created_at: Timestamp,
}

impl Offer {
    /// The subject's embedded vendor user id, when present and a string.
    pub fn vendor_user_id(&self) -> Option<&str> {
        self.credential_subject.get(VENDOR_USER_ID_FIELD).and_then(Value::as_str)
    }

    /// Whether this offer was approved at issuance.
    pub fn is_approved(&self) -> bool {
        self.did.is_some()
    }

    /// Linked credentials with superseded (`invalidAt`-marked) links
    /// stripped. `None` when nothing remains, so empty lists are omitted
    /// from the issued credential instead of serialized as `[]`.
    pub fn active_linked_credentials(&self) -> Option<Vec<LinkedCredential>> {
        let active: Vec<LinkedCredential> = self
            .linked_credentials
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|link| link.invalid_at.is_none())
            .cloned()
            .collect();
        if active.is_empty() {
            None
        } else {
            Some(active)
        }
    }
}

/// Compute the content hash of an offer's credential content.
///
/// Hashes the type array plus the credential subject with the
/// platform-internal `vendorUserId` removed, over canonical bytes, so the
/// same credential content always collides regardless of key order or
/// which holder it is addressed to.
pub fn offer_content_hash(
    credential_types: &[String],
    credential_subject: &Map<String, Value>,
) -> Result<ContentHash, CredexError> {
    let mut subject = credential_subject.clone();
    subject.remove(VENDOR_USER_ID_FIELD);
    let content = json!({
        "type": credential_types,
        "credentialSubject": subject,
    });
    let canonical = CanonicalBytes::new(&content).map_err(|e| {
        CredexError::internal(
            codes::BAD_CREDENTIAL_SUBJECT,
            format!("offer content cannot be canonicalized: {e}"),
        )
    })?;
    Ok(content_hash(&canonical))
}
