//! # Exchange Progress Projection
//!
//! Folds the event history into the small externally visible
//! completion/error summary. This is the one place that walks `events`
//! for "how far along is this exchange"; callers must not re-derive it
//! from the raw log.

use serde::{Deserialize, Serialize};

use credex_core::ExchangeId;

use crate::exchange::Exchange;
use crate::state::{ExchangeState, ExchangeType};

/// Externally visible completion summary of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeProgress {
    /// The exchange this summarizes.
    pub id: ExchangeId,
    /// Issuing or disclosure flow.
    #[serde(rename = "type")]
    pub exchange_type: ExchangeType,
    /// Whether the exchange reached a terminal outcome.
    pub exchange_complete: bool,
    /// Whether the disclosure step finished.
    pub disclosure_complete: bool,
    /// Terminal error state name, when the outcome was an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_error: Option<String>,
}

/// Fold the event list left-to-right into a progress summary.
///
/// - `IDENTIFIED` sets `disclosure_complete` for issuing exchanges only.
/// - `COMPLETE` sets both flags.
/// - `NOT_IDENTIFIED` and `UNEXPECTED_ERROR` record the error state name
///   and complete the exchange.
/// - Once `exchange_complete` is true, remaining events are ignored, so
///   the summary is stable under further appends.
pub fn build_exchange_progress(exchange: &Exchange) -> ExchangeProgress {
    let mut progress = ExchangeProgress {
        id: exchange.id,
        exchange_type: exchange.exchange_type,
        exchange_complete: false,
        disclosure_complete: false,
        exchange_error: None,
    };

    for event in &exchange.events {
        if progress.exchange_complete {
            break;
        }
        match event.state {
            ExchangeState::Identified => {
                if exchange.exchange_type == ExchangeType::Issuing {
                    progress.disclosure_complete = true;
                }
            }
            ExchangeState::Complete => {
                progress.exchange_complete = true;
                progress.disclosure_complete = true;
            }
            ExchangeState::NotIdentified | ExchangeState::UnexpectedError => {
                progress.exchange_error = Some(event.state.name().to_string());
                progress.exchange_complete = true;
            }
            _ => {}
        }
    }

    progress
}
