//! # HTTP Vendor Gateway
//!
//! `reqwest`-backed [`VendorGateway`] implementation. Paths are joined
//! onto the vendor's configured base URL; the wallet push delegate is the
//! one call that goes to a caller-supplied absolute URL instead.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use credex_exchange::{PushDelegate, VendorEndpoint};

use crate::error::VendorError;
use crate::gateway::VendorGateway;
use crate::retry::retry_send;
use crate::types::{IdentificationPayload, IdentityResult, VendorOffersFilter, VendorOffersResponse};

/// Wire path for each vendor endpoint family.
fn endpoint_path(endpoint: VendorEndpoint) -> &'static str {
    match endpoint {
        VendorEndpoint::ReceiveCheckedCredentials => "receive-checked-credentials",
        VendorEndpoint::ReceiveUncheckedCredentials => "receive-unchecked-credentials",
        VendorEndpoint::IssuingIdentification => "issuing-identification",
        VendorEndpoint::IntegratedIssuingIdentification => "integrated-issuing-identification",
    }
}

/// Production vendor gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVendorGateway {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpVendorGateway {
    /// Create a gateway for the vendor at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `VendorError::Config` when the base URL does not parse.
    pub fn new(base_url: &str, bearer_token: Option<String>) -> Result<Self, VendorError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| VendorError::Config(format!("invalid vendor base URL {base_url:?}: {e}")))?;
        Ok(Self { client: reqwest::Client::new(), base_url, bearer_token })
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, VendorError> {
        self.base_url
            .join(path)
            .map_err(|e| VendorError::Config(format!("cannot join endpoint {path:?}: {e}")))
    }

    async fn post_json(&self, url: Url, body: &Value) -> Result<reqwest::Response, VendorError> {
        let endpoint = url.path().to_string();
        let resp = retry_send(|| {
            let mut req = self.client.post(url.clone()).json(body);
            if let Some(token) = &self.bearer_token {
                req = req.bearer_auth(token);
            }
            req.send()
        })
        .await
        .map_err(|source| VendorError::Http { endpoint: endpoint.clone(), source })?;
        Ok(resp)
    }

    async fn expect_success(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, VendorError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(VendorError::Api { endpoint: endpoint.to_string(), status: status.as_u16(), body })
        }
    }
}

#[async_trait]
impl VendorGateway for HttpVendorGateway {
    async fn request_offers(
        &self,
        filter: &VendorOffersFilter,
    ) -> Result<VendorOffersResponse, VendorError> {
        let url = self.endpoint_url("offers")?;
        let endpoint = url.path().to_string();
        let body = serde_json::to_value(filter)
            .map_err(|e| VendorError::Config(format!("unserializable offers filter: {e}")))?;

        let resp = self.post_json(url, &body).await?;
        if resp.status().as_u16() == 202 {
            tracing::info!(exchange = %filter.exchange_id, "vendor still computing offers");
            return Ok(VendorOffersResponse::Pending);
        }

        let resp = Self::expect_success(&endpoint, resp).await?;
        #[derive(serde::Deserialize)]
        struct OffersBody {
            #[serde(default)]
            offers: Vec<Value>,
        }
        let body: OffersBody = resp
            .json()
            .await
            .map_err(|source| VendorError::Deserialization { endpoint, source })?;
        Ok(VendorOffersResponse::Ready(body.offers))
    }

    async fn identify_user(
        &self,
        payload: &IdentificationPayload,
    ) -> Result<IdentityResult, VendorError> {
        let url = self.endpoint_url(endpoint_path(VendorEndpoint::IssuingIdentification))?;
        let endpoint = url.path().to_string();
        let body = serde_json::to_value(payload)
            .map_err(|e| VendorError::Config(format!("unserializable identify payload: {e}")))?;

        let resp = self.post_json(url, &body).await?;
        if resp.status().as_u16() == 404 {
            return Err(VendorError::UserNotFound);
        }
        let resp = Self::expect_success(&endpoint, resp).await?;
        resp.json()
            .await
            .map_err(|source| VendorError::Deserialization { endpoint, source })
    }

    async fn send_credentials(
        &self,
        endpoint: VendorEndpoint,
        payload: &Value,
    ) -> Result<(), VendorError> {
        let url = self.endpoint_url(endpoint_path(endpoint))?;
        let path = url.path().to_string();
        let resp = self.post_json(url, payload).await?;
        Self::expect_success(&path, resp).await?;
        Ok(())
    }

    async fn send_push(
        &self,
        payload: &Value,
        delegate: &PushDelegate,
    ) -> Result<(), VendorError> {
        let url = Url::parse(&delegate.push_url)
            .map_err(|e| VendorError::Config(format!("invalid push delegate URL: {e}")))?;
        let endpoint = url.path().to_string();
        let resp = retry_send(|| {
            self.client
                .post(url.clone())
                .bearer_auth(&delegate.push_token)
                .json(payload)
                .send()
        })
        .await
        .map_err(|source| VendorError::Http { endpoint: endpoint.clone(), source })?;
        Self::expect_success(&endpoint, resp).await?;
        Ok(())
    }

    async fn notify_offers_accepted(&self, payload: &Value) -> Result<(), VendorError> {
        let url = self.endpoint_url("issued-credentials")?;
        let path = url.path().to_string();
        let resp = self.post_json(url, payload).await?;
        Self::expect_success(&path, resp).await?;
        Ok(())
    }
}
