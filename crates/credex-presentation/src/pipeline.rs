//! # Presentation Intake Pipeline
//!
//! One submission runs: shape validation, the at-most-once claim, the
//! `DISCLOSURE_RECEIVED` transition, credential decoding, then either the
//! unchecked branch (no cryptographic verification) or the checked branch
//! with identity resolution (issuing) or vendor forwarding (disclosure).
//!
//! Once a submission wins the claim there is no mid-pipeline
//! cancellation; it runs to completion or raises, and durable outcomes
//! are recorded on the exchange before the error propagates.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use credex_core::{codes, CredexError, Did, EngineConfig, ExchangeId, Timestamp, VendorUserId};
use credex_exchange::{
    Disclosure, Exchange, ExchangeState, ExchangeStore, ExchangeType, VendorEndpoint,
};
use credex_vendor::{IdentificationPayload, VendorError, VendorGateway};

use crate::identity::match_identity;
use crate::jwt::decode_credential;
use crate::user::{PlatformUser, UserStore};
use crate::verifier::{CheckedCredential, CheckResult, CredentialChecks, CredentialVerifier};

/// One wallet presentation submission.
#[derive(Debug, Clone)]
pub struct PresentationSubmission {
    /// Wallet-supplied presentation identifier; the at-most-once key.
    pub presentation_id: String,
    /// The exchange being presented against.
    pub exchange_id: ExchangeId,
    /// The holder the credentials must be bound to.
    pub holder_did: Did,
    /// Credential JWTs as presented.
    pub credentials: Vec<String>,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct PresentationReceipt {
    /// The exchange the presentation completed against.
    pub exchange_id: ExchangeId,
    /// Verified credentials with their check vectors. Empty on the
    /// unchecked branch.
    pub checked_credentials: Vec<CheckedCredential>,
    /// The resolved platform user.
    pub user: PlatformUser,
}

/// The presentation intake pipeline.
pub struct PresentationPipeline {
    exchange_store: Arc<dyn ExchangeStore>,
    user_store: Arc<dyn UserStore>,
    vendor: Arc<dyn VendorGateway>,
    verifier: Arc<dyn CredentialVerifier>,
    config: EngineConfig,
}

impl PresentationPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(
        exchange_store: Arc<dyn ExchangeStore>,
        user_store: Arc<dyn UserStore>,
        vendor: Arc<dyn VendorGateway>,
        verifier: Arc<dyn CredentialVerifier>,
        config: EngineConfig,
    ) -> Self {
        Self { exchange_store, user_store, vendor, verifier, config }
    }

    /// Run one submission through the pipeline.
    pub async fn submit_presentation(
        &self,
        disclosure: &Disclosure,
        submission: &PresentationSubmission,
    ) -> Result<PresentationReceipt, CredexError> {
        if submission.presentation_id.is_empty() {
            return Err(CredexError::validation(
                codes::BAD_PRESENTATION,
                "presentation id must not be empty",
            ));
        }
        if submission.credentials.is_empty() {
            return Err(CredexError::validation(
                codes::BAD_PRESENTATION,
                "presentation carries no credentials",
            ));
        }

        let exchange = self.exchange_store.get(&submission.exchange_id).await?;

        // At-most-once: the loser of a concurrent race observes a failed
        // claim here and never transitions the exchange.
        if !self
            .exchange_store
            .try_claim_presentation(&exchange.id, &submission.presentation_id)
            .await?
        {
            return Err(CredexError::conflict(
                codes::PRESENTATION_DUPLICATE,
                format!("exchange {} already received a presentation", exchange.id),
            ));
        }

        let mut context = Map::new();
        context.insert("disclosureConsentedAt".to_string(), json!(Timestamp::now()));
        let exchange = self
            .exchange_store
            .add_state(&exchange.id, ExchangeState::DisclosureReceived, context)
            .await?;

        let decoded: Vec<Value> = submission
            .credentials
            .iter()
            .map(|jwt| decode_credential(jwt))
            .collect::<Result<_, _>>()?;

        if disclosure.receives_unchecked_credentials() {
            return self.unchecked_branch(disclosure, &exchange, &decoded, submission).await;
        }

        let checked = self
            .verifier
            .verify_credentials(&submission.credentials, &submission.holder_did)
            .await?;
        let exchange = self
            .exchange_store
            .add_state(&exchange.id, ExchangeState::DisclosureChecked, Map::new())
            .await?;

        match exchange.exchange_type {
            ExchangeType::Issuing => {
                if self.config.auto_identity_check {
                    enforce_credential_checks(&checked)?;
                }
                self.identify_and_finish(disclosure, &exchange, &decoded, checked).await
            }
            ExchangeType::Disclosure => {
                self.forward_and_finish(disclosure, &exchange, checked, submission).await
            }
        }
    }

    /// Unchecked branch: no verification, no identity matching. Raw and
    /// decoded credentials go to the vendor; the exchange completes with
    /// an anonymous user and an empty checked list.
    async fn unchecked_branch(
        &self,
        disclosure: &Disclosure,
        exchange: &Exchange,
        decoded: &[Value],
        submission: &PresentationSubmission,
    ) -> Result<PresentationReceipt, CredexError> {
        self.exchange_store
            .add_state(&exchange.id, ExchangeState::DisclosureUnchecked, Map::new())
            .await?;

        let payload = json!({
            "exchangeId": exchange.id,
            "presentationId": submission.presentation_id,
            "credentials": decoded,
            "rawCredentials": submission.credentials,
        });
        self.vendor
            .send_credentials(VendorEndpoint::ReceiveUncheckedCredentials, &payload)
            .await
            .map_err(vendor_error)?;

        let user = self.user_store.create_anonymous(&exchange.tenant_id).await?;
        self.exchange_store.add_state(&exchange.id, ExchangeState::Complete, Map::new()).await?;

        tracing::info!(exchange = %exchange.id, disclosure = %disclosure.id, "unchecked presentation forwarded");
        Ok(PresentationReceipt {
            exchange_id: exchange.id,
            checked_credentials: Vec::new(),
            user,
        })
    }

    /// Issuing branch: resolve the holder's identity, then mark the
    /// exchange `IDENTIFIED` with the vendor user id merged in.
    async fn identify_and_finish(
        &self,
        disclosure: &Disclosure,
        exchange: &Exchange,
        decoded: &[Value],
        checked: Vec<CheckedCredential>,
    ) -> Result<PresentationReceipt, CredexError> {
        let vendor_user_id = match disclosure.vendor_endpoint {
            VendorEndpoint::IssuingIdentification => {
                self.identify_on_vendor(exchange, decoded).await?
            }
            VendorEndpoint::IntegratedIssuingIdentification => {
                self.identify_integrated(disclosure, exchange, decoded).await?
            }
            VendorEndpoint::ReceiveCheckedCredentials
            | VendorEndpoint::ReceiveUncheckedCredentials => {
                return Err(CredexError::internal(
                    codes::INVALID_DISCLOSURE_CONFIGURATION,
                    format!(
                        "issuing exchange {} requires an identification endpoint",
                        exchange.id
                    ),
                ));
            }
        };

        let user =
            self.user_store.upsert_by_vendor_user_id(&exchange.tenant_id, &vendor_user_id).await?;

        let mut context = Map::new();
        context.insert("vendorUserId".to_string(), json!(vendor_user_id));
        self.exchange_store
            .add_state(&exchange.id, ExchangeState::Identified, context)
            .await?;

        Ok(PresentationReceipt {
            exchange_id: exchange.id,
            checked_credentials: checked,
            user,
        })
    }

    /// Push the identity document to the vendor's identify endpoint.
    async fn identify_on_vendor(
        &self,
        exchange: &Exchange,
        decoded: &[Value],
    ) -> Result<VendorUserId, CredexError> {
        let payload = IdentificationPayload {
            exchange_id: exchange.id,
            tenant_id: exchange.tenant_id,
            credentials: decoded.to_vec(),
            identity_matcher_values: exchange.identity_matcher_values.clone(),
        };
        let result = match self.vendor.identify_user(&payload).await {
            Ok(result) => result,
            Err(VendorError::UserNotFound) => {
                return Err(self
                    .record_not_identified(
                        exchange,
                        codes::UPSTREAM_USER_NOT_FOUND,
                        "vendor does not recognize the holder",
                    )
                    .await);
            }
            Err(e) => {
                return Err(CredexError::upstream(
                    codes::UPSTREAM_VENDOR_ERROR,
                    e.to_string(),
                    None,
                ));
            }
        };

        match result.vendor_user_id.as_str() {
            Some(s) if !s.is_empty() => Ok(VendorUserId::new(s)),
            _ => Err(self
                .record_not_identified(
                    exchange,
                    codes::UPSTREAM_USERID_NOT_STRING,
                    "vendor returned a non-string or empty vendorUserId",
                )
                .await),
        }
    }

    /// Match against identity values stored on sibling exchanges of the
    /// same disclosure.
    async fn identify_integrated(
        &self,
        disclosure: &Disclosure,
        exchange: &Exchange,
        decoded: &[Value],
    ) -> Result<VendorUserId, CredexError> {
        let Some(matchers) = &disclosure.identity_matchers else {
            return Err(CredexError::internal(
                codes::INVALID_DISCLOSURE_CONFIGURATION,
                format!("disclosure {} has no identity matchers", disclosure.id),
            ));
        };

        let siblings = self.exchange_store.find_by_disclosure(&disclosure.id).await?;
        for sibling in &siblings {
            if let Some(vendor_user_id) =
                match_identity(matchers, decoded, &sibling.identity_matcher_values)?
            {
                tracing::debug!(
                    exchange = %exchange.id,
                    matched_against = %sibling.id,
                    "integrated identification matched"
                );
                return Ok(vendor_user_id);
            }
        }

        Err(self
            .record_not_identified(
                exchange,
                codes::NOT_IDENTIFIED,
                "presented credentials match no stored identity values",
            )
            .await)
    }

    /// Record `NOT_IDENTIFIED` on the exchange, then build the 401. The
    /// transition happens before propagation so the audit trail stays
    /// authoritative even though the response is an error.
    async fn record_not_identified(
        &self,
        exchange: &Exchange,
        code: &'static str,
        message: &str,
    ) -> CredexError {
        if let Err(e) = self
            .exchange_store
            .add_state(&exchange.id, ExchangeState::NotIdentified, Map::new())
            .await
        {
            tracing::error!(exchange = %exchange.id, error = %e, "failed to record NOT_IDENTIFIED");
        }
        CredexError::unauthorized(code, message, Some(ExchangeState::NotIdentified.name()))
    }

    /// Disclosure branch: forward checked credentials to the vendor,
    /// optionally push a verified notification, and complete.
    async fn forward_and_finish(
        &self,
        disclosure: &Disclosure,
        exchange: &Exchange,
        checked: Vec<CheckedCredential>,
        submission: &PresentationSubmission,
    ) -> Result<PresentationReceipt, CredexError> {
        let payload = json!({
            "exchangeId": exchange.id,
            "presentationId": submission.presentation_id,
            "credentials": checked,
            "rawCredentials": submission.credentials,
            "paymentRequired": disclosure.payment_required,
        });
        self.vendor
            .send_credentials(VendorEndpoint::ReceiveCheckedCredentials, &payload)
            .await
            .map_err(vendor_error)?;

        if disclosure.send_push_on_verification {
            if let Some(delegate) = &exchange.push_delegate {
                let notification = json!({
                    "exchangeId": exchange.id,
                    "notificationType": "PRESENTATION_VERIFIED",
                });
                if let Err(e) = self.vendor.send_push(&notification, delegate).await {
                    tracing::warn!(exchange = %exchange.id, error = %e, "verified push failed");
                }
            }
        }

        let user = self.user_store.create_anonymous(&exchange.tenant_id).await?;
        self.exchange_store.add_state(&exchange.id, ExchangeState::Complete, Map::new()).await?;

        Ok(PresentationReceipt { exchange_id: exchange.id, checked_credentials: checked, user })
    }
}

/// Fail on any failed credential check, most severe kind first.
fn enforce_credential_checks(checked: &[CheckedCredential]) -> Result<(), CredexError> {
    type Get = fn(&CredentialChecks) -> CheckResult;
    let kinds: [(&str, Get); 5] = [
        ("untampered", |c| c.untampered),
        ("trusted_issuer", |c| c.trusted_issuer),
        ("unrevoked", |c| c.unrevoked),
        ("unexpired", |c| c.unexpired),
        ("trusted_holder", |c| c.trusted_holder),
    ];
    for (name, get) in kinds {
        if checked.iter().any(|c| get(&c.credential_checks).failed()) {
            return Err(CredexError::validation(
                codes::CREDENTIAL_CHECK_FAILED,
                format!("a presented credential failed the {name} check"),
            ));
        }
    }
    Ok(())
}

/// Translate a vendor gateway failure into the engine taxonomy.
fn vendor_error(err: VendorError) -> CredexError {
    CredexError::upstream(codes::UPSTREAM_VENDOR_ERROR, err.to_string(), None)
}
