//! # In-Memory Exchange Store
//!
//! Reference implementation of [`ExchangeStore`] backed by a mutex-guarded
//! map. Each store method takes and releases the lock without awaiting
//! while held, so every document mutation is a single atomic section,
//! which is exactly the conditional-update contract a database-backed
//! implementation must reproduce.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use credex_core::{codes, CredexError, DisclosureId, ExchangeId};

use crate::event::ExchangeEvent;
use crate::exchange::Exchange;
use crate::state::ExchangeState;
use crate::store::ExchangeStore;

/// Mutex-guarded in-memory exchange store.
#[derive(Debug, Default)]
pub struct MemoryExchangeStore {
    exchanges: Mutex<HashMap<ExchangeId, Exchange>>,
}

impl MemoryExchangeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ExchangeId, Exchange>> {
        // Lock poisoning means a panic mid-mutation in another task;
        // continuing with the inner data is the correct recovery here
        // because every mutation section is panic-free in this module.
        self.exchanges.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ExchangeStore for MemoryExchangeStore {
    async fn insert(&self, exchange: Exchange) -> Result<(), CredexError> {
        self.lock().insert(exchange.id, exchange);
        Ok(())
    }

    async fn find(&self, id: &ExchangeId) -> Result<Option<Exchange>, CredexError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn find_by_disclosure(
        &self,
        disclosure_id: &DisclosureId,
    ) -> Result<Vec<Exchange>, CredexError> {
        Ok(self
            .lock()
            .values()
            .filter(|e| e.disclosure_id == *disclosure_id)
            .cloned()
            .collect())
    }

    async fn add_state(
        &self,
        id: &ExchangeId,
        state: ExchangeState,
        context: Map<String, Value>,
    ) -> Result<Exchange, CredexError> {
        let mut exchanges = self.lock();
        let exchange = exchanges
            .get_mut(id)
            .ok_or_else(|| CredexError::not_found(format!("exchange {id} does not exist")))?;

        let current = exchange.current_state();
        if !current.can_transition(state) {
            return Err(CredexError::internal(
                codes::INVALID_STATE_TRANSITION,
                format!("no edge {current} -> {state} on exchange {id}"),
            ));
        }

        tracing::debug!(exchange = %id, from = %current, to = %state, "exchange state transition");
        exchange.apply_context(&context);
        exchange.events.push(ExchangeEvent::with_context(state, context));
        Ok(exchange.clone())
    }

    async fn merge_fields(
        &self,
        id: &ExchangeId,
        fields: Map<String, Value>,
    ) -> Result<Exchange, CredexError> {
        let mut exchanges = self.lock();
        let exchange = exchanges
            .get_mut(id)
            .ok_or_else(|| CredexError::not_found(format!("exchange {id} does not exist")))?;
        exchange.apply_context(&fields);
        Ok(exchange.clone())
    }

    async fn try_claim_presentation(
        &self,
        id: &ExchangeId,
        presentation_id: &str,
    ) -> Result<bool, CredexError> {
        let mut exchanges = self.lock();
        let exchange = exchanges
            .get_mut(id)
            .ok_or_else(|| CredexError::not_found(format!("exchange {id} does not exist")))?;

        if exchange.presentation_id.is_some() {
            return Ok(false);
        }
        exchange.presentation_id = Some(presentation_id.to_string());
        Ok(true)
    }
}
