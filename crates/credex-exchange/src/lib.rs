//! # credex-exchange: The Exchange Aggregate
//!
//! An exchange is the stateful record of one wallet-to-issuer/verifier
//! interaction. This crate owns:
//!
//! - **State machine** (`state.rs`): the `ExchangeState` enum and its
//!   explicit transition table. No transition is permitted that is not an
//!   explicit edge.
//!
//! - **Event log** (`event.rs`, `exchange.rs`): the append-only `events`
//!   sequence. Prior events are never edited; "current state" is the last
//!   event, read through the aggregate rather than scattered call sites.
//!
//! - **Progress projection** (`progress.rs`): folds the event log into the
//!   small externally visible completion/error summary.
//!
//! - **Store abstraction** (`store.rs`, `memory.rs`): `ExchangeStore` with
//!   `add_state` append semantics and the `try_claim_presentation`
//!   compare-and-swap primitive that makes presentation submission
//!   at-most-once per exchange. Implementations against other storage
//!   engines must preserve the atomic conditional-update contract exactly.
//!
//! ## Crate Policy
//!
//! - Depends only on `credex-core` internally.
//! - All concurrency safety lives in atomic single-document conditional
//!   updates at the store; no locks are exposed to callers.

pub mod disclosure;
pub mod event;
pub mod exchange;
pub mod memory;
pub mod progress;
pub mod state;
pub mod store;

pub use disclosure::{Disclosure, IdentityMatchers, MatcherRule, VendorEndpoint};
pub use event::ExchangeEvent;
pub use exchange::{Exchange, PushDelegate};
pub use memory::MemoryExchangeStore;
pub use progress::{build_exchange_progress, ExchangeProgress};
pub use state::{ExchangeState, ExchangeType};
pub use store::{ensure_offers_unclaimed, ExchangeStore};
