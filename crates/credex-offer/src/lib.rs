//! # credex-offer: Offer Sourcing
//!
//! Everything between "a vendor or operator has candidate credential
//! content" and "these offers are issuable in this exchange":
//!
//! - **Offer document** (`offer.rs`): the stored offer, issuer storage
//!   forms, linked-credential references, and the content hash that is
//!   the de-duplication key.
//!
//! - **Validator** (`validator.rs`): envelope schema, temporal-field
//!   exclusivity, commercial-entity branding, and subject-schema checks
//!   with the platform-internal `vendorUserId` isolated from the domain
//!   schema.
//!
//! - **Loader** (`loader.rs`): mode-routed assembly of the issuable set.
//!   Mode dispatch is an exhaustive match over [`OfferMode`], not a
//!   string-keyed lookup.
//!
//! - **Store abstraction** (`store.rs`, `memory.rs`): per-offer atomic
//!   approval; offers never contend with each other.
//!
//! [`OfferMode`]: credex_core::OfferMode

pub mod loader;
pub mod memory;
pub mod offer;
pub mod store;
pub mod validator;

pub use loader::{LoadedOffers, OfferLoadOutcome, OfferLoader, STATUS_DUPLICATE, STATUS_OK};
pub use memory::MemoryOfferStore;
pub use offer::{
    offer_content_hash, LinkedCredential, Offer, OfferApproval, OfferIssuer, VENDOR_USER_ID_FIELD,
};
pub use store::{OfferStore, PreparedOffersFilter};
pub use validator::{validate_offer, ValidationContext};
