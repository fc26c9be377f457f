//! # Offer Loader / Mode Router
//!
//! Resolves the offer sourcing mode and assembles the issuable offer set
//! for an exchange: vendor pull (when the mode calls for one), per-offer
//! validation with partial-success statuses, content-hash de-duplication,
//! and the prepared-offers database lookup.
//!
//! State transitions around loading stay with the caller, with one
//! exception: a vendor offer missing its `offerId` is a data integrity
//! violation the loader records as `OFFER_ID_UNDEFINED_ERROR` itself
//! before raising, so the audit trail is authoritative even on error.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use credex_core::{
    codes, ContentHash, CredexError, Did, EngineConfig, OfferId, OfferMode, Timestamp,
};
use credex_exchange::{Disclosure, Exchange, ExchangeState, ExchangeStore};
use credex_schema::SchemaRegistry;
use credex_vendor::{VendorError, VendorGateway, VendorOffersFilter, VendorOffersResponse};

use crate::offer::{offer_content_hash, Offer, OfferIssuer};
use crate::store::{OfferStore, PreparedOffersFilter};
use crate::validator::{validate_offer, ValidationContext};

/// Per-offer status: validated and carried forward.
pub const STATUS_OK: &str = "OK";

/// Per-offer status: content hash was already seen; excluded from the
/// issuable set.
pub const STATUS_DUPLICATE: &str = "Duplicate";

/// The assembled offer set plus per-offer vendor statuses.
#[derive(Debug, Clone)]
pub struct LoadedOffers {
    /// Issuable offers: freshly validated vendor offers plus previously
    /// prepared ones, de-duplicated by content hash.
    pub offers: Vec<Offer>,
    /// Outcome per vendor offer id: `OK`, `Duplicate`, or the validation
    /// error text. Empty when no vendor pull happened.
    pub vendor_offer_statuses: BTreeMap<String, String>,
}

/// Result of a load: ready offers, or the vendor is still computing.
#[derive(Debug, Clone)]
pub enum OfferLoadOutcome {
    /// Offers are ready.
    Ready(LoadedOffers),
    /// Vendor answered 202; the caller transitions the exchange to
    /// `OFFERS_WAITING_ON_VENDOR` and retries later.
    WaitingOnVendor,
}

/// Mode-routed offer loader.
pub struct OfferLoader {
    exchange_store: Arc<dyn ExchangeStore>,
    offer_store: Arc<dyn OfferStore>,
    vendor: Arc<dyn VendorGateway>,
    registry: Arc<SchemaRegistry>,
    config: EngineConfig,
}

impl OfferLoader {
    /// Create a loader over the given collaborators.
    pub fn new(
        exchange_store: Arc<dyn ExchangeStore>,
        offer_store: Arc<dyn OfferStore>,
        vendor: Arc<dyn VendorGateway>,
        registry: Arc<SchemaRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self { exchange_store, offer_store, vendor, registry, config }
    }

    /// The effective mode: the disclosure's when set, else the tenant-wide
    /// default.
    fn resolve_mode(&self, disclosure: &Disclosure) -> OfferMode {
        disclosure.offer_mode.unwrap_or(self.config.default_offer_mode)
    }

    /// Assemble the issuable offer set for an exchange.
    ///
    /// `offer_hashes` are content hashes the caller already holds; offers
    /// matching any of them come back `Duplicate` and are excluded from
    /// the issuable set.
    pub async fn load_offers(
        &self,
        exchange: &Exchange,
        disclosure: &Disclosure,
        tenant_did: &Did,
        offer_hashes: &[ContentHash],
    ) -> Result<OfferLoadOutcome, CredexError> {
        let mode = self.resolve_mode(disclosure);
        let mut known: HashSet<ContentHash> = offer_hashes.iter().cloned().collect();

        let pull_vendor = match mode {
            OfferMode::Preloaded => false,
            // A full request/wait cycle already happened: the offers the
            // vendor computed are in the database now.
            OfferMode::Webhook | OfferMode::All => !exchange.completed_vendor_round_trip(),
            OfferMode::Legacy => true,
        };

        let mut offers = Vec::new();
        let mut statuses = BTreeMap::new();
        if pull_vendor {
            let filter = VendorOffersFilter {
                vendor_user_id: exchange.vendor_user_id.clone(),
                vendor_organization_id: disclosure.vendor_organization_id.clone(),
                tenant_did: tenant_did.clone(),
                tenant_id: exchange.tenant_id,
                exchange_id: exchange.id,
                types: disclosure.credential_types.clone(),
            };
            match self.vendor.request_offers(&filter).await.map_err(vendor_error)? {
                VendorOffersResponse::Pending => {
                    return Ok(OfferLoadOutcome::WaitingOnVendor);
                }
                VendorOffersResponse::Ready(raw_offers) => {
                    let batch = self
                        .process_vendor_batch(exchange, disclosure, &raw_offers, &mut known, false)
                        .await?;
                    offers = batch.0;
                    statuses = batch.1;
                }
            }
        }

        let include_prepared = match mode {
            // The push path persists webhook offers; pre-prepared ones are
            // skipped until a batch actually arrived.
            OfferMode::Webhook => exchange.has_state(ExchangeState::OffersReceived),
            OfferMode::Preloaded | OfferMode::All | OfferMode::Legacy => true,
        };
        if include_prepared {
            let filter = PreparedOffersFilter {
                tenant_id: Some(exchange.tenant_id),
                vendor_user_id: exchange.vendor_user_id.clone(),
                credential_types: disclosure.credential_types.clone(),
                excluded_hashes: known.iter().cloned().collect(),
                exchange_id: (mode == OfferMode::Legacy).then_some(exchange.id),
            };
            offers.extend(self.offer_store.find_unique_prepared_offers(&filter).await?);
        }

        tracing::info!(
            exchange = %exchange.id,
            mode = ?mode,
            offers = offers.len(),
            "assembled offer set"
        );
        Ok(OfferLoadOutcome::Ready(LoadedOffers { offers, vendor_offer_statuses: statuses }))
    }

    /// Entry point for the vendor webhook push path.
    ///
    /// Pushed offers always get full subject validation, are persisted,
    /// and the exchange is transitioned to `OFFERS_RECEIVED` with the
    /// offer ids and per-offer statuses merged into the document.
    pub async fn receive_vendor_offers(
        &self,
        exchange: &Exchange,
        disclosure: &Disclosure,
        raw_offers: &[Value],
    ) -> Result<LoadedOffers, CredexError> {
        let mut known: HashSet<ContentHash> = self
            .offer_store
            .find_by_exchange(&exchange.id)
            .await?
            .into_iter()
            .map(|o| o.content_hash)
            .collect();

        let (offers, statuses) = self
            .process_vendor_batch(exchange, disclosure, raw_offers, &mut known, true)
            .await?;

        let offer_ids: Vec<&OfferId> = offers.iter().map(|o| &o.offer_id).collect();
        let mut context = Map::new();
        context.insert("offerIds".to_string(), json!(offer_ids));
        context.insert("vendorOfferStatuses".to_string(), json!(&statuses));
        self.exchange_store
            .add_state(&exchange.id, ExchangeState::OffersReceived, context)
            .await?;

        Ok(LoadedOffers { offers, vendor_offer_statuses: statuses })
    }

    /// Validate one vendor batch into offers plus per-offer statuses.
    ///
    /// Offers with status `OK` are persisted and returned; duplicates and
    /// invalid offers stay visible in the status map only.
    async fn process_vendor_batch(
        &self,
        exchange: &Exchange,
        disclosure: &Disclosure,
        raw_offers: &[Value],
        known_hashes: &mut HashSet<ContentHash>,
        force_subject_validation: bool,
    ) -> Result<(Vec<Offer>, BTreeMap<String, String>), CredexError> {
        // The fatal integrity check runs over the whole batch before any
        // per-offer processing: one missing offerId poisons the batch.
        if raw_offers.iter().any(|raw| vendor_offer_id(raw).is_none()) {
            self.exchange_store
                .add_state(&exchange.id, ExchangeState::OfferIdUndefinedError, Map::new())
                .await?;
            return Err(CredexError::upstream(
                codes::UPSTREAM_OFFER_ID_MISSING,
                format!("vendor batch for exchange {} contains an offer without offerId", exchange.id),
                Some(ExchangeState::OfferIdUndefinedError.name()),
            ));
        }

        let ctx = ValidationContext {
            disclosure,
            config: &self.config,
            registry: &self.registry,
        };

        let mut offers = Vec::new();
        let mut statuses = BTreeMap::new();
        for raw in raw_offers {
            let offer_id = vendor_offer_id(raw).unwrap_or_default().to_string();
            let status = match validate_offer(raw, true, force_subject_validation, &ctx)
                .and_then(|validated| self.build_offer(&validated, exchange))
            {
                Err(e) => e.to_string(),
                Ok(offer) => {
                    if known_hashes.insert(offer.content_hash.clone()) {
                        offers.push(offer);
                        STATUS_OK.to_string()
                    } else {
                        STATUS_DUPLICATE.to_string()
                    }
                }
            };
            statuses.insert(offer_id, status);
        }

        if self.config.error_on_invalid_webhook_offers
            && statuses.values().any(|s| s != STATUS_OK)
        {
            return Err(CredexError::validation(
                codes::UPSTREAM_OFFERS_INVALID,
                format!("vendor batch rejected in strict mode: {statuses:?}"),
            ));
        }

        self.offer_store.insert_many(offers.clone()).await?;
        Ok((offers, statuses))
    }

    /// Build the stored offer document from a validated vendor offer.
    fn build_offer(&self, validated: &Value, exchange: &Exchange) -> Result<Offer, CredexError> {
        let offer_id = OfferId::new(vendor_offer_id(validated).unwrap_or_default());
        let credential_types: Vec<String> = validated
            .get("type")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let credential_subject = validated
            .get("credentialSubject")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let issuer: OfferIssuer = serde_json::from_value(
            validated.get("issuer").cloned().unwrap_or(Value::Null),
        )
        .map_err(|e| {
            CredexError::validation(codes::BAD_VENDOR_OFFER, format!("malformed issuer: {e}"))
        })?;

        let content_hash = offer_content_hash(&credential_types, &credential_subject)?;
        Ok(Offer {
            offer_id,
            tenant_id: exchange.tenant_id,
            exchange_id: Some(exchange.id),
            credential_types,
            credential_subject,
            issuer: issuer.normalize(self.config.store_issuer_as_string),
            content_hash,
            linked_credentials: parse_optional(validated, "linkedCredentials")?,
            expiration_date: parse_optional(validated, "expirationDate")?,
            valid_until: parse_optional(validated, "validUntil")?,
            credential_status: validated.get("credentialStatus").cloned(),
            did: None,
            consented_at: None,
            digest: None,
            created_at: Timestamp::now(),
        })
    }
}

/// The vendor offer id, when present as a non-empty string.
fn vendor_offer_id(raw: &Value) -> Option<&str> {
    raw.get("offerId").and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Deserialize an optional field from a validated offer value.
fn parse_optional<T: serde::de::DeserializeOwned>(
    value: &Value,
    field: &str,
) -> Result<Option<T>, CredexError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            CredexError::validation(
                codes::BAD_VENDOR_OFFER,
                format!("malformed {field}: {e}"),
            )
        }),
    }
}

/// Translate a vendor gateway failure into the engine taxonomy.
fn vendor_error(err: VendorError) -> CredexError {
    CredexError::upstream(codes::UPSTREAM_VENDOR_ERROR, err.to_string(), None)
}
