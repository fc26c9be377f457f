//! # Engine Configuration
//!
//! One explicit configuration struct, constructed by the embedding service
//! and passed by reference into each component entry point. Components
//! never consult ambient global state for behavior flags.

use serde::{Deserialize, Serialize};

/// How offers for an exchange are sourced.
///
/// Resolved per request: the disclosure's `offerMode` wins when set,
/// otherwise the tenant-wide [`EngineConfig::default_offer_mode`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferMode {
    /// Database only: offers were loaded ahead of the exchange.
    Preloaded,
    /// Vendor push path: skip pre-prepared offers unless one was already
    /// received over the webhook.
    Webhook,
    /// Vendor pull plus database, skipping the vendor call if a full
    /// request/wait cycle already occurred.
    All,
    /// Vendor pull filtered to the current exchange only.
    Legacy,
}

/// Deep-link construction parameters.
///
/// Malformed base URLs here are a construction-time defect of the
/// embedding service, not a runtime error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepLinkConfig {
    /// Custom protocol scheme the wallet registers, e.g. `credex://`.
    pub protocol: String,
    /// Base URL for the get-credential-manifest request endpoint.
    pub manifest_request_url: String,
    /// Base URL for the get-presentation-request endpoint.
    pub presentation_request_url: String,
}

/// Tenant-agnostic engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Validate credential subjects against their type schemas.
    /// Overridden per call by `force_credential_subject_validation`.
    pub enable_offer_validation: bool,
    /// Fail a presentation immediately on any failed credential check,
    /// before identity resolution begins.
    pub auto_identity_check: bool,
    /// Tenant-wide fallback offer mode when the disclosure sets none.
    pub default_offer_mode: OfferMode,
    /// Strict webhook mode: reject the whole batch when any vendor offer
    /// is invalid, forcing the vendor to self-correct.
    pub error_on_invalid_webhook_offers: bool,
    /// Collapse offer issuers to a bare DID string instead of the
    /// `{id, name, image, type}` projection.
    pub store_issuer_as_string: bool,
    /// Notify the vendor's issued-credentials webhook after approval.
    pub trigger_offers_accepted_webhook: bool,
    /// Deep-link construction parameters.
    pub deep_link: DeepLinkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_offer_validation: true,
            auto_identity_check: false,
            default_offer_mode: OfferMode::Legacy,
            error_on_invalid_webhook_offers: false,
            store_issuer_as_string: false,
            trigger_offers_accepted_webhook: true,
            deep_link: DeepLinkConfig {
                protocol: "credex://".to_string(),
                manifest_request_url:
                    "https://agent.example.com/api/holder/get-credential-manifest".to_string(),
                presentation_request_url:
                    "https://agent.example.com/api/holder/get-presentation-request".to_string(),
            },
        }
    }
}
