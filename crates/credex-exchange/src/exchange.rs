//! # The Exchange Aggregate
//!
//! Root document of one wallet interaction. Mutated exclusively through
//! the store's `add_state` append operation (plus the presentation-claim
//! CAS); never deleted by the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use credex_core::{DisclosureId, ExchangeId, OfferId, TenantId, Timestamp, VendorUserId};

use crate::event::ExchangeEvent;
use crate::state::{ExchangeState, ExchangeType};

/// Wallet push-notification delegate registered by the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDelegate {
    /// Push gateway URL.
    pub push_url: String,
    /// Opaque token identifying the wallet installation.
    pub push_token: String,
}

/// The stateful record of one wallet-to-issuer/verifier interaction.
///
/// The `events` sequence is append-only and authoritative: the last event
/// is the current state. Optional fields are set opportunistically as the
/// exchange progresses, merged in by `add_state` context fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    /// Unique exchange identifier.
    pub id: ExchangeId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The issuing/inspection policy this exchange runs under.
    pub disclosure_id: DisclosureId,
    /// Issuing or disclosure flow.
    #[serde(rename = "type")]
    pub exchange_type: ExchangeType,
    /// Append-only ordered event history.
    pub events: Vec<ExchangeEvent>,
    /// When the exchange was created.
    pub created_at: Timestamp,

    /// The vendor's identifier for the holder, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_user_id: Option<VendorUserId>,
    /// Offers currently associated with this exchange.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offer_ids: Vec<OfferId>,
    /// Proof challenge bound to the holder, if issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// When the challenge was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_issued_at: Option<Timestamp>,
    /// Values extracted by the disclosure's identity matchers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_matcher_values: Vec<String>,
    /// Set at most once per exchange via the CAS claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_id: Option<String>,
    /// When the holder consented to the disclosure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure_consented_at: Option<Timestamp>,
    /// Wallet push delegate, if registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_delegate: Option<PushDelegate>,
    /// Offers approved at issuance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalized_offer_ids: Vec<OfferId>,
    /// Per-offer validation outcome from the latest vendor batch, keyed by
    /// offer id. `OK`, `Duplicate`, or the validation error text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vendor_offer_statuses: BTreeMap<String, String>,
}

impl Exchange {
    /// Create an exchange in `NEW` state with an empty optional surface.
    pub fn new(
        tenant_id: TenantId,
        disclosure_id: DisclosureId,
        exchange_type: ExchangeType,
    ) -> Self {
        Self {
            id: ExchangeId::new(),
            tenant_id,
            disclosure_id,
            exchange_type,
            events: vec![ExchangeEvent::new(ExchangeState::New)],
            created_at: Timestamp::now(),
            vendor_user_id: None,
            offer_ids: Vec::new(),
            challenge: None,
            challenge_issued_at: None,
            identity_matcher_values: Vec::new(),
            presentation_id: None,
            disclosure_consented_at: None,
            push_delegate: None,
            finalized_offer_ids: Vec::new(),
            vendor_offer_statuses: BTreeMap::new(),
        }
    }

    /// The authoritative current state: the last event in `events`.
    pub fn current_state(&self) -> ExchangeState {
        // An exchange is created with its NEW event; an empty log cannot
        // be constructed through this crate's API.
        self.events.last().map(|e| e.state).unwrap_or(ExchangeState::New)
    }

    /// Whether `state` has ever occurred in the event history.
    pub fn has_state(&self, state: ExchangeState) -> bool {
        self.events.iter().any(|e| e.state == state)
    }

    /// Whether a full vendor request/wait cycle already occurred: the
    /// history contains both `OFFERS_WAITING_ON_VENDOR` and
    /// `OFFERS_RECEIVED`. Used by the offer loader to decide whether a
    /// fresh vendor pull can be skipped.
    pub fn completed_vendor_round_trip(&self) -> bool {
        self.has_state(ExchangeState::OffersWaitingOnVendor)
            && self.has_state(ExchangeState::OffersReceived)
    }

    /// Merge contextual fields from a state transition into the typed
    /// document fields. Unknown keys stay on the event only.
    pub(crate) fn apply_context(&mut self, context: &Map<String, Value>) {
        for (key, value) in context {
            match key.as_str() {
                "vendorUserId" => {
                    if let Some(s) = value.as_str() {
                        self.vendor_user_id = Some(VendorUserId::new(s));
                    }
                }
                "offerIds" => {
                    if let Ok(ids) = serde_json::from_value::<Vec<OfferId>>(value.clone()) {
                        self.offer_ids = ids;
                    }
                }
                "challenge" => {
                    if let Some(s) = value.as_str() {
                        self.challenge = Some(s.to_string());
                    }
                }
                "challengeIssuedAt" => {
                    if let Ok(ts) = serde_json::from_value::<Timestamp>(value.clone()) {
                        self.challenge_issued_at = Some(ts);
                    }
                }
                "identityMatcherValues" => {
                    if let Ok(values) = serde_json::from_value::<Vec<String>>(value.clone()) {
                        self.identity_matcher_values = values;
                    }
                }
                "disclosureConsentedAt" => {
                    if let Ok(ts) = serde_json::from_value::<Timestamp>(value.clone()) {
                        self.disclosure_consented_at = Some(ts);
                    }
                }
                "pushDelegate" => {
                    if let Ok(delegate) = serde_json::from_value::<PushDelegate>(value.clone()) {
                        self.push_delegate = Some(delegate);
                    }
                }
                "finalizedOfferIds" => {
                    if let Ok(ids) = serde_json::from_value::<Vec<OfferId>>(value.clone()) {
                        self.finalized_offer_ids = ids;
                    }
                }
                "vendorOfferStatuses" => {
                    if let Ok(statuses) =
                        serde_json::from_value::<BTreeMap<String, String>>(value.clone())
                    {
                        self.vendor_offer_statuses = statuses;
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_exchange() -> Exchange {
        Exchange::new(TenantId::new(), DisclosureId::new(), ExchangeType::Issuing)
    }

    #[test]
    fn test_new_exchange_starts_in_new_state() {
        let exchange = make_exchange();
        assert_eq!(exchange.current_state(), ExchangeState::New);
        assert_eq!(exchange.events.len(), 1);
    }

    #[test]
    fn test_has_state() {
        let exchange = make_exchange();
        assert!(exchange.has_state(ExchangeState::New));
        assert!(!exchange.has_state(ExchangeState::Complete));
    }

    #[test]
    fn test_vendor_round_trip_requires_both_states() {
        let mut exchange = make_exchange();
        assert!(!exchange.completed_vendor_round_trip());
        exchange.events.push(ExchangeEvent::new(ExchangeState::OffersWaitingOnVendor));
        assert!(!exchange.completed_vendor_round_trip());
        exchange.events.push(ExchangeEvent::new(ExchangeState::OffersReceived));
        assert!(exchange.completed_vendor_round_trip());
    }

    #[test]
    fn test_apply_context_merges_known_fields() {
        let mut exchange = make_exchange();
        let mut ctx = Map::new();
        ctx.insert("vendorUserId".to_string(), json!("adam@x.com"));
        ctx.insert("offerIds".to_string(), json!(["o1", "o2"]));
        ctx.insert("unknownField".to_string(), json!(42));
        exchange.apply_context(&ctx);
        assert_eq!(exchange.vendor_user_id, Some(VendorUserId::new("adam@x.com")));
        assert_eq!(exchange.offer_ids.len(), 2);
    }

    #[test]
    fn test_serde_uses_type_and_camel_case() {
        let exchange = make_exchange();
        let value = serde_json::to_value(&exchange).unwrap();
        assert_eq!(value["type"], "ISSUING");
        assert!(value.get("tenantId").is_some());
        // Unset optionals are omitted entirely.
        assert!(value.get("presentationId").is_none());
    }
}
