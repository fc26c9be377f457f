//! # Exchange State Machine
//!
//! Runtime-validated enum state machine for the exchange lifecycle.
//!
//! ## States
//!
//! ```text
//! NEW ──▶ CREDENTIAL_MANIFEST_REQUESTED ──▶ OFFERS_REQUESTED
//!                    │                          │
//!                    ▼                          ├──▶ OFFERS_SENT ──▶ OFFERS_RECEIVED
//!            DISCLOSURE_RECEIVED                ├──▶ OFFERS_WAITING_ON_VENDOR
//!                    │                          ├──▶ NO_OFFERS_RECEIVED
//!         ┌──────────┼──────────┐               └──▶ OFFER_VALIDATION_ERROR
//!         ▼          ▼          ▼
//! DISCLOSURE_   DISCLOSURE_  DISCLOSURE_
//!   CHECKED      UNCHECKED    REJECTED
//!         │          │
//!         ▼          ▼
//!    IDENTIFIED ──▶ CLAIMING_IN_PROGRESS ──▶ COMPLETE
//! ```
//!
//! Terminal error states: `NOT_IDENTIFIED`, `UNEXPECTED_ERROR`,
//! `OFFER_ID_UNDEFINED_ERROR`. `UNEXPECTED_ERROR` is reachable from any
//! non-terminal state. `CLAIMING_IN_PROGRESS` guards against concurrent
//! claim attempts.
//!
//! ## Design Decision
//!
//! The exchange has eighteen states, all reached from persisted documents
//! whose state is only known at runtime. An enum with a validated
//! `can_transition()` table is used instead of a typestate encoding, which
//! would require eighteen zero-sized types without proportional safety
//! benefit. The table is the single authority on edges; `add_state`
//! rejects anything else.

use serde::{Deserialize, Serialize};

/// Whether the exchange issues credentials or inspects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeType {
    /// The tenant issues credentials to the holder.
    Issuing,
    /// The tenant inspects credentials presented by the holder.
    Disclosure,
}

impl ExchangeType {
    /// Returns the canonical type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issuing => "ISSUING",
            Self::Disclosure => "DISCLOSURE",
        }
    }
}

impl std::fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The state recorded by one exchange event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeState {
    /// Exchange created by the operator-facing controller.
    New,
    /// Wallet requested the credential manifest.
    CredentialManifestRequested,
    /// Wallet requested offers for this exchange.
    OffersRequested,
    /// Offers were sent to the holder wallet.
    OffersSent,
    /// Vendor answered 202; offers are still being computed.
    OffersWaitingOnVendor,
    /// Vendor delivered offers for this exchange.
    OffersReceived,
    /// No offers were available for this exchange.
    NoOffersReceived,
    /// A vendor offer failed validation.
    OfferValidationError,
    /// A presentation was received from the holder.
    DisclosureReceived,
    /// Presented credentials passed verification checks.
    DisclosureChecked,
    /// Verification was skipped per disclosure policy.
    DisclosureUnchecked,
    /// The presentation was rejected.
    DisclosureRejected,
    /// The holder was matched to a vendor user.
    Identified,
    /// The holder could not be identified (terminal).
    NotIdentified,
    /// Offer claim is in progress; concurrent claims must conflict.
    ClaimingInProgress,
    /// The exchange finished successfully (terminal).
    Complete,
    /// Unrecoverable failure (terminal).
    UnexpectedError,
    /// A vendor offer arrived without an offer id (terminal).
    OfferIdUndefinedError,
}

impl ExchangeState {
    /// Returns the canonical state name (e.g. `OFFERS_REQUESTED`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::CredentialManifestRequested => "CREDENTIAL_MANIFEST_REQUESTED",
            Self::OffersRequested => "OFFERS_REQUESTED",
            Self::OffersSent => "OFFERS_SENT",
            Self::OffersWaitingOnVendor => "OFFERS_WAITING_ON_VENDOR",
            Self::OffersReceived => "OFFERS_RECEIVED",
            Self::NoOffersReceived => "NO_OFFERS_RECEIVED",
            Self::OfferValidationError => "OFFER_VALIDATION_ERROR",
            Self::DisclosureReceived => "DISCLOSURE_RECEIVED",
            Self::DisclosureChecked => "DISCLOSURE_CHECKED",
            Self::DisclosureUnchecked => "DISCLOSURE_UNCHECKED",
            Self::DisclosureRejected => "DISCLOSURE_REJECTED",
            Self::Identified => "IDENTIFIED",
            Self::NotIdentified => "NOT_IDENTIFIED",
            Self::ClaimingInProgress => "CLAIMING_IN_PROGRESS",
            Self::Complete => "COMPLETE",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
            Self::OfferIdUndefinedError => "OFFER_ID_UNDEFINED_ERROR",
        }
    }

    /// Whether this state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete
                | Self::NotIdentified
                | Self::UnexpectedError
                | Self::OfferIdUndefinedError
                | Self::DisclosureRejected
        )
    }

    /// Whether this state is a terminal error recorded as the exchange's
    /// durable outcome.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotIdentified | Self::UnexpectedError | Self::OfferIdUndefinedError)
    }

    /// Whether the transition `self -> to` is an explicit edge of the
    /// state machine.
    ///
    /// `UNEXPECTED_ERROR` is reachable from every non-terminal state so
    /// that any failure can be recorded as a durable outcome.
    pub fn can_transition(&self, to: ExchangeState) -> bool {
        use ExchangeState::*;

        if self.is_terminal() {
            return false;
        }
        if to == UnexpectedError {
            return true;
        }

        matches!(
            (*self, to),
            (New, CredentialManifestRequested)
                | (New, OffersRequested)
                | (New, DisclosureReceived)
                | (CredentialManifestRequested, OffersRequested)
                | (CredentialManifestRequested, DisclosureReceived)
                | (OffersRequested, OffersSent)
                | (OffersRequested, OffersWaitingOnVendor)
                | (OffersRequested, OffersReceived)
                | (OffersRequested, NoOffersReceived)
                | (OffersRequested, OfferValidationError)
                | (OffersRequested, OfferIdUndefinedError)
                | (OffersSent, OffersReceived)
                | (OffersSent, OffersRequested)
                | (OffersSent, ClaimingInProgress)
                | (OffersSent, Complete)
                | (OffersWaitingOnVendor, OffersRequested)
                | (OffersWaitingOnVendor, OffersReceived)
                | (OffersWaitingOnVendor, NoOffersReceived)
                | (OffersReceived, OffersSent)
                | (OffersReceived, NoOffersReceived)
                | (OffersReceived, OfferValidationError)
                | (OffersReceived, DisclosureReceived)
                | (OffersReceived, ClaimingInProgress)
                | (OffersReceived, Complete)
                | (NoOffersReceived, OffersRequested)
                | (OfferValidationError, OffersRequested)
                | (DisclosureReceived, DisclosureChecked)
                | (DisclosureReceived, DisclosureUnchecked)
                | (DisclosureReceived, DisclosureRejected)
                | (DisclosureChecked, Identified)
                | (DisclosureChecked, NotIdentified)
                | (DisclosureChecked, Complete)
                | (DisclosureUnchecked, Complete)
                | (Identified, OffersRequested)
                | (Identified, ClaimingInProgress)
                | (Identified, Complete)
                | (ClaimingInProgress, Complete)
        )
    }
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
