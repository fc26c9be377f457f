//! # Offer Store Abstraction
//!
//! Offers are mutated independently of the exchange document; each
//! approval is scoped to its own offer, so concurrent approvals across
//! different offers in the same exchange never contend.

use async_trait::async_trait;

use credex_core::{ContentHash, CredexError, ExchangeId, OfferId, TenantId, VendorUserId};

use crate::offer::{Offer, OfferApproval};

/// Query for previously prepared offers.
///
/// `excluded_hashes` is the union of caller-supplied and freshly validated
/// vendor hashes, so stale duplicates of anything already seen never come
/// back. `exchange_id` scopes legacy-mode lookups to one exchange.
#[derive(Debug, Clone, Default)]
pub struct PreparedOffersFilter {
    /// Owning tenant.
    pub tenant_id: Option<TenantId>,
    /// Restrict to offers addressed to this holder.
    pub vendor_user_id: Option<VendorUserId>,
    /// Restrict to offers carrying at least one of these types.
    pub credential_types: Option<Vec<String>>,
    /// Content hashes to exclude.
    pub excluded_hashes: Vec<ContentHash>,
    /// Scope to one exchange (legacy mode).
    pub exchange_id: Option<ExchangeId>,
}

impl PreparedOffersFilter {
    /// Whether an offer satisfies this filter. Approved offers never
    /// match; they are finalized, not prepared.
    pub fn matches(&self, offer: &Offer) -> bool {
        if offer.is_approved() {
            return false;
        }
        if let Some(tenant_id) = &self.tenant_id {
            if offer.tenant_id != *tenant_id {
                return false;
            }
        }
        if let Some(vendor_user_id) = &self.vendor_user_id {
            if offer.vendor_user_id() != Some(vendor_user_id.as_str()) {
                return false;
            }
        }
        if let Some(types) = &self.credential_types {
            if !offer.credential_types.iter().any(|t| types.contains(t)) {
                return false;
            }
        }
        if let Some(exchange_id) = &self.exchange_id {
            if offer.exchange_id.as_ref() != Some(exchange_id) {
                return false;
            }
        }
        !self.excluded_hashes.contains(&offer.content_hash)
    }
}

/// Persistent record of offers.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Persist a batch of validated offers.
    async fn insert_many(&self, offers: Vec<Offer>) -> Result<(), CredexError>;

    /// Previously prepared offers matching the filter, de-duplicated by
    /// content hash within the result set.
    async fn find_unique_prepared_offers(
        &self,
        filter: &PreparedOffersFilter,
    ) -> Result<Vec<Offer>, CredexError>;

    /// All offers bound to an exchange.
    async fn find_by_exchange(&self, exchange_id: &ExchangeId)
        -> Result<Vec<Offer>, CredexError>;

    /// Bind prepared offers to an exchange.
    async fn assign_to_exchange(
        &self,
        offer_ids: &[OfferId],
        exchange_id: &ExchangeId,
    ) -> Result<u64, CredexError>;

    /// Record approval on one offer: sets `did`, the subject snapshot,
    /// the consent timestamp, and the JWT digest.
    ///
    /// Atomic per offer and applied at most once; returns `false` when the
    /// offer does not exist or was already approved. Partial failure in a
    /// batch must not block offers already approved.
    async fn approve_offer(
        &self,
        exchange_id: &ExchangeId,
        offer_id: &OfferId,
        approval: OfferApproval,
    ) -> Result<bool, CredexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{offer_content_hash, OfferIssuer};
    use credex_core::{Did, Timestamp};
    use serde_json::json;

    fn make_offer(email: &str) -> Offer {
        let mut credential_subject = serde_json::Map::new();
        credential_subject.insert("vendorUserId".to_string(), json!("adam@x.com"));
        credential_subject.insert("email".to_string(), json!(email));
        let content_hash =
            offer_content_hash(&["EmailV1.0".to_string()], &credential_subject).unwrap();
        Offer {
            offer_id: OfferId::new(format!("offer-{email}")),
            tenant_id: TenantId::new(),
            exchange_id: None,
            credential_types: vec!["EmailV1.0".to_string()],
            credential_subject,
            issuer: OfferIssuer::Did(Did::new("did:ion:issuer")),
            content_hash,
            linked_credentials: None,
            expiration_date: None,
            valid_until: None,
            credential_status: None,
            did: None,
            consented_at: None,
            digest: None,
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_filter_excludes_hashes() {
        let offer = make_offer("a@x.com");
        let mut filter = PreparedOffersFilter::default();
        assert!(filter.matches(&offer));
        filter.excluded_hashes.push(offer.content_hash.clone());
        assert!(!filter.matches(&offer));
    }

    #[test]
    fn test_filter_by_vendor_user_and_types() {
        let offer = make_offer("a@x.com");
        let filter = PreparedOffersFilter {
            vendor_user_id: Some(VendorUserId::new("adam@x.com")),
            credential_types: Some(vec!["EmailV1.0".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches(&offer));

        let filter = PreparedOffersFilter {
            vendor_user_id: Some(VendorUserId::new("someone-else@x.com")),
            ..Default::default()
        };
        assert!(!filter.matches(&offer));

        let filter = PreparedOffersFilter {
            credential_types: Some(vec!["PhoneV1.0".to_string()]),
            ..Default::default()
        };
        assert!(!filter.matches(&offer));
    }

    #[test]
    fn test_filter_excludes_approved_offers() {
        let mut offer = make_offer("a@x.com");
        offer.did = Some(Did::new("did:velocity:abc"));
        assert!(!PreparedOffersFilter::default().matches(&offer));
    }

    #[test]
    fn test_filter_exchange_scope() {
        let mut offer = make_offer("a@x.com");
        let exchange_id = ExchangeId::new();
        let filter =
            PreparedOffersFilter { exchange_id: Some(exchange_id), ..Default::default() };
        assert!(!filter.matches(&offer));
        offer.exchange_id = Some(exchange_id);
        assert!(filter.matches(&offer));
    }
}
