//! # credex-deeplink
//!
//! Wallet-bound URL construction. An issuing or inspection deep link is a
//! custom-protocol URL (e.g. `credex://`) whose `request_uri` parameter
//! points the wallet at the engine's get-credential-manifest or
//! get-presentation-request endpoint, alongside the counterparty DID and
//! an optional vendor origin context.
//!
//! Construction is pure: no state, no I/O. Malformed base URLs are a
//! defect of the embedding service's configuration and are rejected once
//! when the builder is created, never on the per-link hot path.

use url::form_urlencoded::Serializer;
use url::Url;

use credex_core::{codes, CredexError, DeepLinkConfig, Did, DisclosureId, ExchangeId};

/// Parameters shared by issuing and inspection links.
#[derive(Debug, Clone)]
pub struct DeepLinkParams<'a> {
    /// The disclosure the wallet is being sent to.
    pub disclosure_id: DisclosureId,
    /// Bind the link to one exchange, when already created.
    pub exchange_id: Option<ExchangeId>,
    /// Restrict the wallet to these credential types, when set.
    pub credential_types: Option<&'a [String]>,
    /// Opaque vendor context echoed back untouched on the return leg.
    pub vendor_origin_context: Option<&'a str>,
}

/// Deep-link builder with pre-validated base URLs.
#[derive(Debug, Clone)]
pub struct DeepLinkBuilder {
    protocol: String,
    manifest_base: Url,
    presentation_base: Url,
}

impl DeepLinkBuilder {
    /// Validate the configured base URLs and protocol scheme.
    ///
    /// # Errors
    ///
    /// 500 `invalid_deep_link_configuration` when either base URL does
    /// not parse or the protocol scheme is empty.
    pub fn new(config: &DeepLinkConfig) -> Result<Self, CredexError> {
        if config.protocol.is_empty() {
            return Err(CredexError::internal(
                codes::INVALID_DEEP_LINK_CONFIGURATION,
                "deep-link protocol scheme is empty",
            ));
        }
        let manifest_base = parse_base(&config.manifest_request_url)?;
        let presentation_base = parse_base(&config.presentation_request_url)?;
        Ok(Self { protocol: config.protocol.clone(), manifest_base, presentation_base })
    }

    /// Deep link sending the wallet to request a credential manifest.
    pub fn issuing_deep_link(&self, issuer_did: &Did, params: &DeepLinkParams<'_>) -> String {
        let request_uri = request_uri(&self.manifest_base, params);
        self.wrap(&request_uri, "issuerDid", issuer_did, params)
    }

    /// Deep link sending the wallet to request a presentation request.
    pub fn inspection_deep_link(&self, inspector_did: &Did, params: &DeepLinkParams<'_>) -> String {
        let request_uri = request_uri(&self.presentation_base, params);
        self.wrap(&request_uri, "inspectorDid", inspector_did, params)
    }

    fn wrap(
        &self,
        request_uri: &str,
        did_param: &str,
        did: &Did,
        params: &DeepLinkParams<'_>,
    ) -> String {
        let mut query = Serializer::new(String::new());
        query.append_pair("request_uri", request_uri);
        query.append_pair(did_param, did.as_str());
        if let Some(context) = params.vendor_origin_context {
            query.append_pair("vendorOriginContext", context);
        }
        format!("{}?{}", self.protocol, query.finish())
    }
}

/// Append the wallet request parameters to a base endpoint URL.
fn request_uri(base: &Url, params: &DeepLinkParams<'_>) -> String {
    let mut uri = base.clone();
    {
        let mut query = uri.query_pairs_mut();
        query.append_pair("id", &params.disclosure_id.to_string());
        if let Some(exchange_id) = params.exchange_id {
            query.append_pair("exchange_id", &exchange_id.to_string());
        }
        for credential_type in params.credential_types.unwrap_or_default() {
            query.append_pair("credential_types", credential_type);
        }
    }
    uri.to_string()
}

fn parse_base(raw: &str) -> Result<Url, CredexError> {
    Url::parse(raw).map_err(|e| {
        CredexError::internal(
            codes::INVALID_DEEP_LINK_CONFIGURATION,
            format!("deep-link base URL {raw:?} does not parse: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DeepLinkConfig {
        DeepLinkConfig {
            protocol: "credex://".to_string(),
            manifest_request_url: "https://agent.example.com/api/holder/get-credential-manifest"
                .to_string(),
            presentation_request_url:
                "https://agent.example.com/api/holder/get-presentation-request".to_string(),
        }
    }

    fn params(disclosure_id: DisclosureId) -> DeepLinkParams<'static> {
        DeepLinkParams {
            disclosure_id,
            exchange_id: None,
            credential_types: None,
            vendor_origin_context: None,
        }
    }

    #[test]
    fn test_issuing_link_wraps_manifest_request_uri() {
        let builder = DeepLinkBuilder::new(&config()).unwrap();
        let disclosure_id = DisclosureId::new();
        let link = builder
            .issuing_deep_link(&Did::new("did:ion:issuer"), &params(disclosure_id));

        assert!(link.starts_with("credex://?request_uri="));
        assert!(link.contains("issuerDid=did%3Aion%3Aissuer"));
        // The disclosure id travels inside the percent-encoded request URI.
        assert!(link.contains(&format!("id%3D{disclosure_id}")));
        assert!(link.contains("get-credential-manifest"));
        assert!(!link.contains("vendorOriginContext"));
    }

    #[test]
    fn test_inspection_link_uses_presentation_base() {
        let builder = DeepLinkBuilder::new(&config()).unwrap();
        let link = builder
            .inspection_deep_link(&Did::new("did:ion:inspector"), &params(DisclosureId::new()));
        assert!(link.contains("get-presentation-request"));
        assert!(link.contains("inspectorDid=did%3Aion%3Ainspector"));
        assert!(!link.contains("issuerDid"));
    }

    #[test]
    fn test_optional_parameters_are_appended() {
        let builder = DeepLinkBuilder::new(&config()).unwrap();
        let exchange_id = ExchangeId::new();
        let types = vec!["EmailV1.0".to_string(), "PhoneV1.0".to_string()];
        let mut p = params(DisclosureId::new());
        p.exchange_id = Some(exchange_id);
        p.credential_types = Some(&types);
        p.vendor_origin_context = Some("session-42");

        let link = builder.issuing_deep_link(&Did::new("did:ion:issuer"), &p);
        assert!(link.contains(&format!("exchange_id%3D{exchange_id}")));
        // One repeated parameter per requested type.
        assert_eq!(link.matches("credential_types%3D").count(), 2);
        assert!(link.contains("vendorOriginContext=session-42"));
    }

    #[test]
    fn test_request_uri_preserves_existing_base_query() {
        let mut cfg = config();
        cfg.manifest_request_url =
            "https://agent.example.com/api/holder/get-credential-manifest?format=jwt".to_string();
        let builder = DeepLinkBuilder::new(&cfg).unwrap();
        let link = builder.issuing_deep_link(&Did::new("did:ion:issuer"), &params(DisclosureId::new()));
        assert!(link.contains("format%3Djwt"));
    }

    #[test]
    fn test_malformed_base_url_is_rejected_at_construction() {
        let mut cfg = config();
        cfg.presentation_request_url = "not a url".to_string();
        let err = DeepLinkBuilder::new(&cfg).unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.code(), Some(codes::INVALID_DEEP_LINK_CONFIGURATION));
    }

    #[test]
    fn test_empty_protocol_is_rejected() {
        let mut cfg = config();
        cfg.protocol = String::new();
        assert!(DeepLinkBuilder::new(&cfg).is_err());
    }
}
