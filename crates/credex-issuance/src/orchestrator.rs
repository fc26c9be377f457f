//! # Credential Issuance Orchestrator
//!
//! Drives one consented offer set through signing, per-offer approval,
//! and the best-effort issued-credentials webhook. Approvals are the
//! source of truth; the webhook never unwinds them.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use credex_core::{codes, CredexError, Did, EngineConfig, SriDigest, Timestamp};
use credex_exchange::{Exchange, ExchangeState, ExchangeStore};
use credex_offer::{Offer, OfferApproval, OfferStore};
use credex_vendor::VendorGateway;

use crate::signer::{
    CredentialSigner, CredentialTypeMetadataSource, IssuerDescriptor, SignerError,
};

/// Orchestrates signing and approval of consented offers.
pub struct IssuanceOrchestrator {
    exchange_store: Arc<dyn ExchangeStore>,
    offer_store: Arc<dyn OfferStore>,
    vendor: Arc<dyn VendorGateway>,
    signer: Arc<dyn CredentialSigner>,
    metadata: Arc<dyn CredentialTypeMetadataSource>,
    config: EngineConfig,
}

impl IssuanceOrchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        exchange_store: Arc<dyn ExchangeStore>,
        offer_store: Arc<dyn OfferStore>,
        vendor: Arc<dyn VendorGateway>,
        signer: Arc<dyn CredentialSigner>,
        metadata: Arc<dyn CredentialTypeMetadataSource>,
        config: EngineConfig,
    ) -> Self {
        Self { exchange_store, offer_store, vendor, signer, metadata, config }
    }

    /// Sign `offers` for `subject_id` and approve each one.
    ///
    /// Returns the signed JWT-VC strings, index-aligned with `offers`.
    ///
    /// # Errors
    ///
    /// A signer permission refusal is recorded as `UNEXPECTED_ERROR` on
    /// the exchange and surfaced as 502 `issuing_not_permitted`. Other
    /// signer failures propagate as 502 without an exchange transition.
    pub async fn issue_credentials(
        &self,
        exchange: &Exchange,
        offers: &[Offer],
        subject_id: &Did,
        consented_at: Timestamp,
        issuer: &IssuerDescriptor,
    ) -> Result<Vec<String>, CredexError> {
        // Superseded linked credentials never reach the signer; an empty
        // remainder is omitted, not serialized as [].
        let prepared: Vec<Offer> = offers
            .iter()
            .map(|offer| {
                let mut offer = offer.clone();
                offer.linked_credentials = offer.active_linked_credentials();
                offer
            })
            .collect();

        let type_metadata = self.load_type_metadata(&prepared).await?;

        let issued = match self
            .signer
            .issue_credentials(&prepared, subject_id, &type_metadata, issuer)
            .await
        {
            Ok(issued) => issued,
            Err(SignerError::NotPermitted { category }) => {
                self.exchange_store
                    .add_state(&exchange.id, ExchangeState::UnexpectedError, Map::new())
                    .await?;
                return Err(CredexError::upstream(
                    codes::ISSUING_NOT_PERMITTED,
                    format!("tenant is not permitted to issue {category}"),
                    Some(ExchangeState::UnexpectedError.name()),
                ));
            }
            Err(SignerError::Other(reason)) => {
                return Err(CredexError::upstream(
                    codes::CREDENTIAL_ISSUANCE_FAILED,
                    reason,
                    None,
                ));
            }
        };

        // Each approval is its own atomic update: a failure on one offer
        // must not block offers already approved.
        let mut approved = Vec::new();
        for (offer, credential) in prepared.iter().zip(&issued) {
            let approval = OfferApproval {
                did: credential.did.clone(),
                credential_subject: offer.credential_subject.clone(),
                consented_at,
                digest: SriDigest::compute(&credential.jwt),
            };
            if self.offer_store.approve_offer(&exchange.id, &offer.offer_id, approval).await? {
                approved.push(offer);
            } else {
                tracing::warn!(
                    exchange = %exchange.id,
                    offer = %offer.offer_id,
                    "offer was already approved or missing, skipping"
                );
            }
        }

        if !approved.is_empty() {
            let mut fields = Map::new();
            fields.insert(
                "finalizedOfferIds".to_string(),
                json!(approved.iter().map(|o| &o.offer_id).collect::<Vec<_>>()),
            );
            self.exchange_store.merge_fields(&exchange.id, fields).await?;
        }

        self.notify_vendor(exchange, &approved).await;

        Ok(issued.into_iter().map(|c| c.jwt).collect())
    }

    /// Metadata for the deduplicated union of offer types.
    async fn load_type_metadata(
        &self,
        offers: &[Offer],
    ) -> Result<HashMap<String, Value>, CredexError> {
        let mut types: Vec<String> = Vec::new();
        for offer in offers {
            for credential_type in &offer.credential_types {
                if !types.contains(credential_type) {
                    types.push(credential_type.clone());
                }
            }
        }
        self.metadata.get_credential_type_metadata(&types).await
    }

    /// Best-effort issued-credentials webhook. Failures are logged and
    /// swallowed; approvals stay committed.
    async fn notify_vendor(&self, exchange: &Exchange, approved: &[&Offer]) {
        if !self.config.trigger_offers_accepted_webhook || approved.is_empty() {
            return;
        }
        let payload = json!({
            "exchangeId": exchange.id,
            "offers": approved
                .iter()
                .map(|o| json!({
                    "offerId": o.offer_id,
                    "type": o.credential_types,
                }))
                .collect::<Vec<_>>(),
        });
        if let Err(e) = self.vendor.notify_offers_accepted(&payload).await {
            tracing::error!(
                exchange = %exchange.id,
                error = %e,
                "issued-credentials webhook failed, approvals remain committed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use credex_core::{DisclosureId, ExchangeId, OfferId, TenantId};
    use credex_exchange::{ExchangeType, MemoryExchangeStore, PushDelegate, VendorEndpoint};
    use credex_offer::{offer_content_hash, LinkedCredential, MemoryOfferStore, OfferIssuer};
    use credex_vendor::{
        IdentificationPayload, IdentityResult, VendorError, VendorOffersFilter,
        VendorOffersResponse,
    };
    use ed25519_dalek::{Signer, SigningKey};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::signer::IssuedCredential;

    /// Ed25519 test signer producing real JWS-shaped strings.
    struct TestSigner {
        key: SigningKey,
        refuse_category: Option<String>,
        last_offers: Mutex<Vec<Offer>>,
    }

    impl TestSigner {
        fn new() -> Self {
            Self {
                key: SigningKey::generate(&mut rand::rngs::OsRng),
                refuse_category: None,
                last_offers: Mutex::new(Vec::new()),
            }
        }

        fn refusing(category: &str) -> Self {
            Self { refuse_category: Some(category.to_string()), ..Self::new() }
        }
    }

    #[async_trait]
    impl CredentialSigner for TestSigner {
        async fn issue_credentials(
            &self,
            offers: &[Offer],
            subject_id: &Did,
            _type_metadata: &HashMap<String, Value>,
            issuer: &IssuerDescriptor,
        ) -> Result<Vec<IssuedCredential>, SignerError> {
            if let Some(category) = &self.refuse_category {
                return Err(SignerError::NotPermitted { category: category.clone() });
            }
            *self.last_offers.lock().unwrap() = offers.to_vec();
            let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT"}"#);
            offers
                .iter()
                .enumerate()
                .map(|(i, offer)| {
                    let did = Did::new(format!("did:velocity:cred-{i}"));
                    let claims = json!({
                        "iss": issuer.tenant_did,
                        "sub": subject_id,
                        "jti": did,
                        "vc": {
                            "type": offer.credential_types,
                            "credentialSubject": offer.credential_subject,
                        },
                    });
                    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
                    let signing_input = format!("{header}.{payload}");
                    let signature = self.key.sign(signing_input.as_bytes());
                    let jwt =
                        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()));
                    Ok(IssuedCredential { jwt, did })
                })
                .collect()
        }
    }

    struct StaticMetadata;

    #[async_trait]
    impl CredentialTypeMetadataSource for StaticMetadata {
        async fn get_credential_type_metadata(
            &self,
            credential_types: &[String],
        ) -> Result<HashMap<String, Value>, CredexError> {
            Ok(credential_types
                .iter()
                .map(|t| (t.clone(), json!({"credentialType": t})))
                .collect())
        }
    }

    /// Vendor stub counting webhook calls, optionally failing them.
    struct CountingVendor {
        webhook_calls: AtomicU32,
        fail_webhook: bool,
    }

    impl CountingVendor {
        fn new(fail_webhook: bool) -> Self {
            Self { webhook_calls: AtomicU32::new(0), fail_webhook }
        }
    }

    #[async_trait]
    impl VendorGateway for CountingVendor {
        async fn request_offers(
            &self,
            _filter: &VendorOffersFilter,
        ) -> Result<VendorOffersResponse, VendorError> {
            Ok(VendorOffersResponse::Ready(vec![]))
        }

        async fn identify_user(
            &self,
            _payload: &IdentificationPayload,
        ) -> Result<IdentityResult, VendorError> {
            Err(VendorError::UserNotFound)
        }

        async fn send_credentials(
            &self,
            _endpoint: VendorEndpoint,
            _payload: &Value,
        ) -> Result<(), VendorError> {
            Ok(())
        }

        async fn send_push(
            &self,
            _payload: &Value,
            _delegate: &PushDelegate,
        ) -> Result<(), VendorError> {
            Ok(())
        }

        async fn notify_offers_accepted(&self, _payload: &Value) -> Result<(), VendorError> {
            self.webhook_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_webhook {
                Err(VendorError::Api {
                    endpoint: "/issued-credentials".to_string(),
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn make_offer(offer_id: &str, exchange_id: ExchangeId, tenant_id: TenantId) -> Offer {
        let mut credential_subject = serde_json::Map::new();
        credential_subject.insert("vendorUserId".to_string(), json!("adam@x.com"));
        credential_subject.insert("email".to_string(), json!(format!("{offer_id}@x.com")));
        let content_hash =
            offer_content_hash(&["EmailV1.0".to_string()], &credential_subject).unwrap();
        Offer {
            offer_id: OfferId::new(offer_id),
            tenant_id,
            exchange_id: Some(exchange_id),
            credential_types: vec!["EmailV1.0".to_string()],
            credential_subject,
            issuer: OfferIssuer::Did(Did::new("did:ion:issuer")),
            content_hash,
            linked_credentials: None,
            expiration_date: None,
            valid_until: None,
            credential_status: None,
            did: None,
            consented_at: None,
            digest: None,
            created_at: Timestamp::now(),
        }
    }

    fn descriptor(tenant_id: TenantId) -> IssuerDescriptor {
        IssuerDescriptor {
            tenant_id,
            tenant_did: Did::new("did:ion:tenant"),
            issuing_kms_key_id: "kms-issuing-1".to_string(),
            issuing_did_key_ref: "#key-1".to_string(),
            dlt_kms_key_id: None,
            dlt_operator_address: None,
            primary_address: None,
        }
    }

    struct Harness {
        orchestrator: IssuanceOrchestrator,
        exchange_store: Arc<MemoryExchangeStore>,
        offer_store: Arc<MemoryOfferStore>,
        vendor: Arc<CountingVendor>,
        signer: Arc<TestSigner>,
        exchange: Exchange,
        offers: Vec<Offer>,
    }

    async fn harness(
        signer: TestSigner,
        vendor: CountingVendor,
        config: EngineConfig,
        offer_count: usize,
    ) -> Harness {
        let exchange_store = Arc::new(MemoryExchangeStore::new());
        let offer_store = Arc::new(MemoryOfferStore::new());
        let vendor = Arc::new(vendor);
        let signer = Arc::new(signer);
        let exchange = Exchange::new(TenantId::new(), DisclosureId::new(), ExchangeType::Issuing);
        exchange_store.insert(exchange.clone()).await.unwrap();

        let offers: Vec<Offer> = (0..offer_count)
            .map(|i| make_offer(&format!("o-{i}"), exchange.id, exchange.tenant_id))
            .collect();
        offer_store.insert_many(offers.clone()).await.unwrap();

        let orchestrator = IssuanceOrchestrator::new(
            Arc::clone(&exchange_store) as Arc<dyn ExchangeStore>,
            Arc::clone(&offer_store) as Arc<dyn OfferStore>,
            Arc::clone(&vendor) as Arc<dyn VendorGateway>,
            Arc::clone(&signer) as Arc<dyn CredentialSigner>,
            Arc::new(StaticMetadata),
            config,
        );
        Harness { orchestrator, exchange_store, offer_store, vendor, signer, exchange, offers }
    }

    #[tokio::test]
    async fn test_issues_and_approves_index_aligned() {
        let h = harness(TestSigner::new(), CountingVendor::new(false), EngineConfig::default(), 2)
            .await;
        let jwts = h
            .orchestrator
            .issue_credentials(
                &h.exchange,
                &h.offers,
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap();

        assert_eq!(jwts.len(), 2);
        let stored = h.offer_store.find_by_exchange(&h.exchange.id).await.unwrap();
        for offer in &stored {
            assert!(offer.is_approved());
            let jwt_index = offer.offer_id.as_str().strip_prefix("o-").unwrap();
            let jwt = &jwts[jwt_index.parse::<usize>().unwrap()];
            // The persisted digest round-trips against the returned JWT.
            assert!(offer.digest.as_ref().unwrap().matches(jwt));
        }

        let exchange = h.exchange_store.find(&h.exchange.id).await.unwrap().unwrap();
        assert_eq!(exchange.finalized_offer_ids.len(), 2);
        assert_eq!(h.vendor.webhook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_permitted_records_unexpected_error() {
        let h = harness(
            TestSigner::refusing("Career"),
            CountingVendor::new(false),
            EngineConfig::default(),
            1,
        )
        .await;
        let err = h
            .orchestrator
            .issue_credentials(
                &h.exchange,
                &h.offers,
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), 502);
        assert_eq!(err.code(), Some(codes::ISSUING_NOT_PERMITTED));
        let exchange = h.exchange_store.find(&h.exchange.id).await.unwrap().unwrap();
        assert_eq!(exchange.current_state(), ExchangeState::UnexpectedError);
        // Nothing was approved.
        let stored = h.offer_store.find_by_exchange(&h.exchange.id).await.unwrap();
        assert!(stored.iter().all(|o| !o.is_approved()));
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_unwind_approvals() {
        let h = harness(TestSigner::new(), CountingVendor::new(true), EngineConfig::default(), 1)
            .await;
        let jwts = h
            .orchestrator
            .issue_credentials(
                &h.exchange,
                &h.offers,
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap();

        assert_eq!(jwts.len(), 1);
        assert_eq!(h.vendor.webhook_calls.load(Ordering::SeqCst), 1);
        let stored = h.offer_store.find_by_exchange(&h.exchange.id).await.unwrap();
        assert!(stored[0].is_approved());
    }

    #[tokio::test]
    async fn test_webhook_skipped_when_disabled() {
        let mut config = EngineConfig::default();
        config.trigger_offers_accepted_webhook = false;
        let h = harness(TestSigner::new(), CountingVendor::new(false), config, 1).await;
        h.orchestrator
            .issue_credentials(
                &h.exchange,
                &h.offers,
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap();
        assert_eq!(h.vendor.webhook_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_webhook_skipped_when_nothing_updated() {
        let h = harness(TestSigner::new(), CountingVendor::new(false), EngineConfig::default(), 0)
            .await;
        // An offer the store has never seen: approval updates nothing.
        let ghost = make_offer("ghost", h.exchange.id, h.exchange.tenant_id);
        h.orchestrator
            .issue_credentials(
                &h.exchange,
                &[ghost],
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap();
        assert_eq!(h.vendor.webhook_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidated_links_stripped_before_signing() {
        let signer = TestSigner::new();
        let h = harness(signer, CountingVendor::new(false), EngineConfig::default(), 1).await;
        let mut offers = h.offers.clone();
        offers[0].linked_credentials = Some(vec![
            LinkedCredential {
                linked_offer_id: OfferId::new("superseded"),
                link_type: Some("REPLACE".to_string()),
                invalid_at: Some(Timestamp::now()),
            },
            LinkedCredential {
                linked_offer_id: OfferId::new("kept"),
                link_type: Some("REPLACE".to_string()),
                invalid_at: None,
            },
        ]);

        h.orchestrator
            .issue_credentials(
                &h.exchange,
                &offers,
                &Did::new("did:ion:holder"),
                Timestamp::now(),
                &descriptor(h.exchange.tenant_id),
            )
            .await
            .unwrap();

        let seen = h.signer.last_offers.lock().unwrap();
        let links = seen[0].linked_credentials.as_ref().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].linked_offer_id, OfferId::new("kept"));
    }
}
