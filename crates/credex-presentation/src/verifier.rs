//! # Credential Verification Seam
//!
//! The pipeline delegates cryptographic verification through
//! [`CredentialVerifier`]; the production implementation (DID resolution,
//! revocation registry, issuer accreditation) lives with the embedding
//! service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use credex_core::{CredexError, Did};

/// Outcome of one verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckResult {
    /// Check ran and passed.
    Pass,
    /// Check ran and failed.
    Fail,
    /// Check does not apply to this credential.
    NotApplicable,
    /// Check could not run.
    NotChecked,
}

impl CheckResult {
    /// Whether this result is a hard failure.
    pub fn failed(self) -> bool {
        self == Self::Fail
    }
}

/// The per-credential check vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialChecks {
    /// Signature matches the issuer key.
    pub untampered: CheckResult,
    /// Issuer is accredited for the credential type.
    pub trusted_issuer: CheckResult,
    /// Credential is not revoked.
    pub unrevoked: CheckResult,
    /// Credential has not expired.
    pub unexpired: CheckResult,
    /// Credential is bound to the presenting holder.
    pub trusted_holder: CheckResult,
}

impl CredentialChecks {
    /// All checks passing.
    pub fn all_pass() -> Self {
        Self {
            untampered: CheckResult::Pass,
            trusted_issuer: CheckResult::Pass,
            unrevoked: CheckResult::Pass,
            unexpired: CheckResult::Pass,
            trusted_holder: CheckResult::Pass,
        }
    }

    /// The first failed check in priority order: tampering, issuer trust,
    /// revocation, expiry, holder binding. Priority is fixed so callers
    /// report the most severe failure when several checks fail at once.
    pub fn first_failure(&self) -> Option<&'static str> {
        if self.untampered.failed() {
            Some("untampered")
        } else if self.trusted_issuer.failed() {
            Some("trusted_issuer")
        } else if self.unrevoked.failed() {
            Some("unrevoked")
        } else if self.unexpired.failed() {
            Some("unexpired")
        } else if self.trusted_holder.failed() {
            Some("trusted_holder")
        } else {
            None
        }
    }
}

/// A presented credential with its decoded content and check vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedCredential {
    /// Decoded credential JSON.
    pub credential: Value,
    /// The raw JWT as presented.
    pub jwt: String,
    /// Verification outcomes.
    pub credential_checks: CredentialChecks,
}

/// Verifies presented credential JWTs.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify each JWT, binding holder checks to `expected_holder`.
    ///
    /// Returns one [`CheckedCredential`] per input, index-aligned. Check
    /// failures are data, not errors; only infrastructure failures raise.
    async fn verify_credentials(
        &self,
        jwts: &[String],
        expected_holder: &Did,
    ) -> Result<Vec<CheckedCredential>, CredexError>;
}
