//! # Disclosure Policy
//!
//! The issuing/inspection policy an exchange runs under. Read-mostly:
//! the engine selects behavior from it and never mutates it.

use serde::{Deserialize, Serialize};

use credex_core::{DisclosureId, OfferMode, TenantId};

/// Which vendor endpoint family receives the outcome of a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorEndpoint {
    /// Forward fully verified credentials to the vendor.
    ReceiveCheckedCredentials,
    /// Forward raw credentials without cryptographic verification.
    ReceiveUncheckedCredentials,
    /// Push the extracted identity document to the vendor's identify
    /// endpoint during issuing.
    IssuingIdentification,
    /// Match the holder against identity values stored on sibling
    /// exchanges instead of calling the vendor.
    IntegratedIssuingIdentification,
}

/// One identity-matching rule from the disclosure configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherRule {
    /// Rule name: `pick` or `all`. Anything else is a configuration
    /// error surfaced as 500 at evaluation time.
    pub rule: String,
    /// Index into the exchange's stored `identityMatcherValues` naming
    /// the target value this rule tests against.
    pub value_index: usize,
    /// Path expressions locating the candidate value(s) inside the
    /// presented credential, e.g. `$.emails`.
    pub path: Vec<String>,
}

/// The disclosure's identity-matching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMatchers {
    /// Which stored value index identifies the vendor user on a match.
    pub vendor_user_id_index: usize,
    /// Rules evaluated against the presented credentials.
    pub rules: Vec<MatcherRule>,
}

/// Issuing/inspection policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    /// Unique disclosure identifier.
    pub id: DisclosureId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Vendor endpoint family for presentation outcomes.
    pub vendor_endpoint: VendorEndpoint,
    /// Per-disclosure offer sourcing mode; the tenant-wide default
    /// applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_mode: Option<OfferMode>,
    /// Identity-matching rules, when integrated identification is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_matchers: Option<IdentityMatchers>,
    /// Commercial entity name offers must carry, when branded issuance
    /// is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commercial_entity_name: Option<String>,
    /// Commercial entity logo offers must carry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commercial_entity_logo: Option<String>,
    /// Credential types this disclosure is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_types: Option<Vec<String>>,
    /// The vendor's own organization identifier, forwarded on pulls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_organization_id: Option<String>,
    /// Send a wallet push notification when verification completes.
    #[serde(default)]
    pub send_push_on_verification: bool,
    /// Forwarded to the vendor with verified credentials: the vendor owes
    /// a payment for this verification.
    #[serde(default)]
    pub payment_required: bool,
}

impl Disclosure {
    /// Whether presented credentials skip cryptographic verification.
    pub fn receives_unchecked_credentials(&self) -> bool {
        self.vendor_endpoint == VendorEndpoint::ReceiveUncheckedCredentials
    }
}
