//! # Error Taxonomy
//!
//! One structured error type for the whole engine, built on `thiserror`.
//!
//! ## Design
//!
//! - Every error carries an HTTP-equivalent status and a machine-readable
//!   code string that callers can branch on without parsing messages.
//! - Errors that represent a durable exchange outcome additionally carry
//!   the exchange error state that must be recorded on the event log
//!   *before* the error is propagated, so the audit trail stays
//!   authoritative even when the response is an error.
//! - Best-effort side effects (webhooks, push notifications) never raise
//!   through this type; their failures are logged and swallowed at the
//!   call site.

use thiserror::Error;

/// Machine-readable error codes surfaced to callers.
pub mod codes {
    /// Vendor offer failed schema validation.
    pub const BAD_VENDOR_OFFER: &str = "bad_vendor_offer";
    /// `expirationDate` and `validUntil` are mutually exclusive.
    pub const CONFLICTING_EXPIRATION: &str = "conflicting_expiration_fields";
    /// Offer issuer does not match the disclosure's commercial entity.
    pub const INVALID_COMMERCIAL_ENTITY: &str = "invalid_commercial_entity";
    /// Credential subject failed its type schema.
    pub const BAD_CREDENTIAL_SUBJECT: &str = "bad_credential_subject";
    /// Malformed timestamp in input.
    pub const BAD_TIMESTAMP: &str = "bad_timestamp";
    /// Malformed presentation submission.
    pub const BAD_PRESENTATION: &str = "bad_presentation";
    /// A second presentation was submitted to the same exchange.
    pub const PRESENTATION_DUPLICATE: &str = "presentation_duplicate";
    /// Offers were already claimed synchronously on this exchange.
    pub const OFFERS_ALREADY_CLAIMED: &str = "exchange_offers_already_claimed";
    /// Vendor returned an offer without an `offerId`.
    pub const UPSTREAM_OFFER_ID_MISSING: &str = "upstream_offers_offer_id_missing";
    /// Strict webhook mode: at least one vendor offer was invalid.
    pub const UPSTREAM_OFFERS_INVALID: &str = "upstream_offers_invalid";
    /// Vendor API call failed (transport error or non-2xx response).
    pub const UPSTREAM_VENDOR_ERROR: &str = "upstream_vendor_error";
    /// Vendor identify endpoint did not recognize the holder.
    pub const UPSTREAM_USER_NOT_FOUND: &str = "upstream_user_not_found";
    /// Vendor identify endpoint returned a non-string or empty user id.
    pub const UPSTREAM_USERID_NOT_STRING: &str = "upstream_userid_not_string";
    /// Holder could not be matched against stored identity values.
    pub const NOT_IDENTIFIED: &str = "not_identified";
    /// A credential failed one of the verification checks.
    pub const CREDENTIAL_CHECK_FAILED: &str = "credential_check_failed";
    /// Signer refused issuance for the credential type's category.
    pub const ISSUING_NOT_PERMITTED: &str = "issuing_not_permitted";
    /// Signer failed for a reason other than a permission refusal.
    pub const CREDENTIAL_ISSUANCE_FAILED: &str = "credential_issuance_failed";
    /// Unrecognized identity-matcher rule name in disclosure config.
    pub const UNKNOWN_MATCHER_RULE: &str = "unknown_identity_matcher_rule";
    /// Disclosure configuration cannot serve this exchange.
    pub const INVALID_DISCLOSURE_CONFIGURATION: &str = "invalid_disclosure_configuration";
    /// Deep-link base URLs in the engine configuration are malformed.
    pub const INVALID_DEEP_LINK_CONFIGURATION: &str = "invalid_deep_link_configuration";
    /// Attempted exchange state transition has no edge in the machine.
    pub const INVALID_STATE_TRANSITION: &str = "invalid_state_transition";
}

/// Top-level error type for the Credex engine.
///
/// Each variant maps to one band of the HTTP taxonomy. The
/// `exchange_error_state` on the 401/502 variants names the exchange state
/// the caller must append before surfacing the error.
#[derive(Error, Debug)]
pub enum CredexError {
    /// Input malformed or inconsistent; caller can correct and resubmit.
    #[error("validation error [{code}]: {message}")]
    Validation {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable detail.
        message: String,
    },

    /// Identity or authorization failure; terminal for this attempt.
    #[error("unauthorized [{code}]: {message}")]
    Unauthorized {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable detail.
        message: String,
        /// Exchange state to record before propagation, if any.
        exchange_error_state: Option<&'static str>,
    },

    /// Conflicting concurrent operation; a signal, not a fault.
    #[error("conflict [{code}]: {message}")]
    Conflict {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable detail.
        message: String,
    },

    /// Referenced entity does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable detail.
        message: String,
    },

    /// Upstream vendor or signer failure.
    #[error("upstream error [{code}]: {message}")]
    Upstream {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable detail.
        message: String,
        /// Exchange state to record before propagation, if any.
        exchange_error_state: Option<&'static str>,
    },

    /// Internal configuration or invariant failure.
    #[error("internal error [{code}]: {message}")]
    Internal {
        /// Machine-readable code from [`codes`].
        code: &'static str,
        /// Human-readable detail.
        message: String,
    },
}

impl CredexError {
    /// Construct a 400 validation error.
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { code, message: message.into() }
    }

    /// Construct a 401 error, optionally naming the exchange error state
    /// that must be recorded before propagation.
    pub fn unauthorized(
        code: &'static str,
        message: impl Into<String>,
        exchange_error_state: Option<&'static str>,
    ) -> Self {
        Self::Unauthorized { code, message: message.into(), exchange_error_state }
    }

    /// Construct a 409 conflict error.
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: message.into() }
    }

    /// Construct a 404 error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Construct a 500/502 upstream error.
    pub fn upstream(
        code: &'static str,
        message: impl Into<String>,
        exchange_error_state: Option<&'static str>,
    ) -> Self {
        Self::Upstream { code, message: message.into(), exchange_error_state }
    }

    /// Construct a 500 internal error.
    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::Internal { code, message: message.into() }
    }

    /// The machine-readable code, if the variant carries one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Validation { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::Conflict { code, .. }
            | Self::Upstream { code, .. }
            | Self::Internal { code, .. } => Some(code),
            Self::NotFound { .. } => None,
        }
    }

    /// The HTTP-equivalent status for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Upstream { code, .. } => {
                // Missing offer ids are a data integrity violation on our
                // side of the contract, reported as 500 rather than 502.
                if *code == codes::UPSTREAM_OFFER_ID_MISSING {
                    500
                } else {
                    502
                }
            }
            Self::Internal { .. } => 500,
        }
    }

    /// Exchange error state to append before propagation, if any.
    pub fn exchange_error_state(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { exchange_error_state, .. }
            | Self::Upstream { exchange_error_state, .. } => *exchange_error_state,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CredexError::validation(codes::BAD_VENDOR_OFFER, "x").status(), 400);
        assert_eq!(
            CredexError::unauthorized(codes::NOT_IDENTIFIED, "x", Some("NOT_IDENTIFIED")).status(),
            401
        );
        assert_eq!(CredexError::conflict(codes::PRESENTATION_DUPLICATE, "x").status(), 409);
        assert_eq!(CredexError::not_found("x").status(), 404);
        assert_eq!(CredexError::internal(codes::UNKNOWN_MATCHER_RULE, "x").status(), 500);
    }

    #[test]
    fn test_offer_id_missing_is_500() {
        let err = CredexError::upstream(
            codes::UPSTREAM_OFFER_ID_MISSING,
            "offer without offerId",
            Some("OFFER_ID_UNDEFINED_ERROR"),
        );
        assert_eq!(err.status(), 500);
        assert_eq!(err.exchange_error_state(), Some("OFFER_ID_UNDEFINED_ERROR"));
    }

    #[test]
    fn test_signer_permission_is_502() {
        let err = CredexError::upstream(
            codes::ISSUING_NOT_PERMITTED,
            "not permitted to issue Career",
            Some("UNEXPECTED_ERROR"),
        );
        assert_eq!(err.status(), 502);
    }

    #[test]
    fn test_display_includes_code() {
        let err = CredexError::validation(codes::INVALID_COMMERCIAL_ENTITY, "name mismatch");
        let s = err.to_string();
        assert!(s.contains("invalid_commercial_entity"));
        assert!(s.contains("name mismatch"));
    }
}
