//! # Exchange Store Abstraction
//!
//! The storage contract every exchange backend must honor. All
//! concurrency safety is pushed into atomic single-document conditional
//! updates; there are no distributed locks or leases. Implementations
//! substituting another storage engine must preserve the compare-and-swap
//! semantics of [`ExchangeStore::try_claim_presentation`] exactly.

use async_trait::async_trait;
use serde_json::{Map, Value};

use credex_core::{codes, CredexError, DisclosureId, ExchangeId, Timestamp};

use crate::exchange::Exchange;
use crate::state::ExchangeState;

/// Persistent record of exchanges and their event history.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Persist a freshly created exchange.
    async fn insert(&self, exchange: Exchange) -> Result<(), CredexError>;

    /// Load an exchange by id.
    async fn find(&self, id: &ExchangeId) -> Result<Option<Exchange>, CredexError>;

    /// Load an exchange by id, failing 404 when absent.
    async fn get(&self, id: &ExchangeId) -> Result<Exchange, CredexError> {
        self.find(id)
            .await?
            .ok_or_else(|| CredexError::not_found(format!("exchange {id} does not exist")))
    }

    /// All exchanges running under the given disclosure. Used by
    /// integrated identification to match a holder against identity
    /// values stored on sibling exchanges.
    async fn find_by_disclosure(
        &self,
        disclosure_id: &DisclosureId,
    ) -> Result<Vec<Exchange>, CredexError>;

    /// Append `{state, timestamp, context}` to the exchange's event log
    /// and merge the context fields into the document.
    ///
    /// Never edits or removes prior events. Safe to call concurrently;
    /// ordering is supplied by the event timestamp and the document-level
    /// atomic append.
    ///
    /// # Errors
    ///
    /// Fails 404 when the exchange does not exist and 500
    /// `invalid_state_transition` when the transition is not an explicit
    /// edge of the state machine.
    async fn add_state(
        &self,
        id: &ExchangeId,
        state: ExchangeState,
        context: Map<String, Value>,
    ) -> Result<Exchange, CredexError>;

    /// Merge opportunistic fields (e.g. the holder challenge) into the
    /// document without a state transition.
    async fn merge_fields(
        &self,
        id: &ExchangeId,
        fields: Map<String, Value>,
    ) -> Result<Exchange, CredexError>;

    /// Bind a proof challenge to the exchange, stamping its issue time.
    /// An opportunistic merge, not a state transition.
    async fn set_challenge(
        &self,
        id: &ExchangeId,
        challenge: &str,
    ) -> Result<Exchange, CredexError> {
        let mut fields = Map::new();
        fields.insert("challenge".to_string(), Value::String(challenge.to_string()));
        fields.insert("challengeIssuedAt".to_string(), serde_json::json!(Timestamp::now()));
        self.merge_fields(id, fields).await
    }

    /// Atomically claim the exchange for a presentation submission.
    ///
    /// Succeeds, setting `presentation_id`, iff no presentation has been
    /// recorded yet. A losing concurrent submitter observes `false` and
    /// must fail 409 `presentation_duplicate`. Resubmitting the winning
    /// presentation id also returns `false`: the claim is at-most-once,
    /// not idempotent-success.
    async fn try_claim_presentation(
        &self,
        id: &ExchangeId,
        presentation_id: &str,
    ) -> Result<bool, CredexError>;
}

/// Guard for offer-claim-sensitive endpoints: fail 409 when the exchange
/// history shows offers were already claimed synchronously.
pub fn ensure_offers_unclaimed(exchange: &Exchange) -> Result<(), CredexError> {
    if exchange.has_state(ExchangeState::ClaimingInProgress)
        || exchange.has_state(ExchangeState::Complete)
    {
        return Err(CredexError::conflict(
            codes::OFFERS_ALREADY_CLAIMED,
            format!("offers already claimed synchronously on exchange {}", exchange.id),
        ));
    }
    Ok(())
}
