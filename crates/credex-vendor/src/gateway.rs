//! The gateway trait the engine programs against.

use async_trait::async_trait;
use serde_json::Value;

use credex_exchange::{PushDelegate, VendorEndpoint};

use crate::error::VendorError;
use crate::types::{IdentificationPayload, IdentityResult, VendorOffersFilter, VendorOffersResponse};

/// Contract for the vendor's backend APIs.
///
/// `request_offers`, `identify_user`, and `send_credentials` are
/// load-bearing; their failures propagate. `send_push` and
/// `notify_offers_accepted` are best-effort notifications whose failures
/// the engine logs and swallows.
#[async_trait]
pub trait VendorGateway: Send + Sync {
    /// Pull candidate offers for an exchange.
    async fn request_offers(
        &self,
        filter: &VendorOffersFilter,
    ) -> Result<VendorOffersResponse, VendorError>;

    /// Push an identity document; the vendor answers with its user id.
    ///
    /// # Errors
    ///
    /// `VendorError::UserNotFound` when the vendor answers 404.
    async fn identify_user(
        &self,
        payload: &IdentificationPayload,
    ) -> Result<IdentityResult, VendorError>;

    /// Forward presented credentials to the vendor endpoint family
    /// configured on the disclosure.
    async fn send_credentials(
        &self,
        endpoint: VendorEndpoint,
        payload: &Value,
    ) -> Result<(), VendorError>;

    /// Push a notification to the holder's wallet delegate.
    async fn send_push(&self, payload: &Value, delegate: &PushDelegate)
        -> Result<(), VendorError>;

    /// Notify the vendor's issued-credentials webhook after approval.
    async fn notify_offers_accepted(&self, payload: &Value) -> Result<(), VendorError>;
}
