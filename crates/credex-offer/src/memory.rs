//! # In-Memory Offer Store
//!
//! Reference implementation of [`OfferStore`] backed by a mutex-guarded
//! vector. Every mutation is a single atomic section; approval is
//! conditional on the offer being unapproved, which is the per-offer
//! compare-and-swap a database-backed implementation must reproduce.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use credex_core::{CredexError, ExchangeId, OfferId};

use crate::offer::{Offer, OfferApproval};
use crate::store::{OfferStore, PreparedOffersFilter};

/// Mutex-guarded in-memory offer store.
#[derive(Debug, Default)]
pub struct MemoryOfferStore {
    offers: Mutex<Vec<Offer>>,
}

impl MemoryOfferStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Offer>> {
        // Mutation sections in this module are panic-free; recovering the
        // inner data on poisoning is safe.
        self.offers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OfferStore for MemoryOfferStore {
    async fn insert_many(&self, offers: Vec<Offer>) -> Result<(), CredexError> {
        self.lock().extend(offers);
        Ok(())
    }

    async fn find_unique_prepared_offers(
        &self,
        filter: &PreparedOffersFilter,
    ) -> Result<Vec<Offer>, CredexError> {
        let offers = self.lock();
        let mut seen = HashSet::new();
        Ok(offers
            .iter()
            .filter(|o| filter.matches(o))
            .filter(|o| seen.insert(o.content_hash.clone()))
            .cloned()
            .collect())
    }

    async fn find_by_exchange(
        &self,
        exchange_id: &ExchangeId,
    ) -> Result<Vec<Offer>, CredexError> {
        Ok(self
            .lock()
            .iter()
            .filter(|o| o.exchange_id.as_ref() == Some(exchange_id))
            .cloned()
            .collect())
    }

    async fn assign_to_exchange(
        &self,
        offer_ids: &[OfferId],
        exchange_id: &ExchangeId,
    ) -> Result<u64, CredexError> {
        let mut offers = self.lock();
        let mut updated = 0;
        for offer in offers.iter_mut() {
            if offer_ids.contains(&offer.offer_id) && offer.exchange_id.is_none() {
                offer.exchange_id = Some(*exchange_id);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn approve_offer(
        &self,
        exchange_id: &ExchangeId,
        offer_id: &OfferId,
        approval: OfferApproval,
    ) -> Result<bool, CredexError> {
        let mut offers = self.lock();
        let Some(offer) = offers.iter_mut().find(|o| {
            o.offer_id == *offer_id && o.exchange_id.as_ref() == Some(exchange_id)
        }) else {
            return Ok(false);
        };
        if offer.is_approved() {
            return Ok(false);
        }
        tracing::debug!(exchange = %exchange_id, offer = %offer_id, "approving offer");
        offer.did = Some(approval.did);
        offer.credential_subject = approval.credential_subject;
        offer.consented_at = Some(approval.consented_at);
        offer.digest = Some(approval.digest);
        Ok(true)
    }
}
