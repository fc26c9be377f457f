//! # Exchange Events
//!
//! The append-only audit trail of an exchange. Each state transition
//! appends one event carrying the state, its timestamp, and any
//! contextual fields the transition supplied. Prior events are never
//! edited or removed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use credex_core::Timestamp;

use crate::state::ExchangeState;

/// One entry in the exchange's ordered event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEvent {
    /// The state entered by this event.
    pub state: ExchangeState,
    /// When the transition occurred (UTC).
    pub timestamp: Timestamp,
    /// Contextual fields recorded with the transition, flattened onto the
    /// event document.
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl ExchangeEvent {
    /// Create an event for `state` stamped now, with no context.
    pub fn new(state: ExchangeState) -> Self {
        Self { state, timestamp: Timestamp::now(), context: Map::new() }
    }

    /// Create an event for `state` stamped now, with contextual fields.
    pub fn with_context(state: ExchangeState, context: Map<String, Value>) -> Self {
        Self { state, timestamp: Timestamp::now(), context }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_flattens_onto_event() {
        let mut ctx = Map::new();
        ctx.insert("vendorUserId".to_string(), json!("adam@x.com"));
        let event = ExchangeEvent::with_context(ExchangeState::Identified, ctx);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "IDENTIFIED");
        assert_eq!(value["vendorUserId"], "adam@x.com");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ExchangeEvent::new(ExchangeState::New);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ExchangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.state, ExchangeState::New);
    }
}
