//! Request/response types for the vendor gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use credex_core::{Did, ExchangeId, TenantId, VendorUserId};

/// Filter sent with a vendor offer pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorOffersFilter {
    /// Holder identifier on the vendor side, when already known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_user_id: Option<VendorUserId>,
    /// The vendor's own organization identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_organization_id: Option<String>,
    /// DID of the issuing tenant.
    pub tenant_did: Did,
    /// The issuing tenant.
    pub tenant_id: TenantId,
    /// The exchange offers are being sourced for.
    pub exchange_id: ExchangeId,
    /// Restrict to these credential types, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

/// Outcome of a vendor offer pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorOffersResponse {
    /// Vendor returned ready offers (HTTP 200). Offers are raw JSON;
    /// validation and parsing belong to the offer loader.
    Ready(Vec<Value>),
    /// Vendor answered 202: offers are still being computed. The caller
    /// transitions the exchange to `OFFERS_WAITING_ON_VENDOR`.
    Pending,
}

/// Identity document pushed to the vendor's identify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationPayload {
    /// The exchange being identified.
    pub exchange_id: ExchangeId,
    /// The issuing tenant.
    pub tenant_id: TenantId,
    /// Decoded credentials extracted from the presentation.
    pub credentials: Vec<Value>,
    /// Values extracted by the disclosure's identity matchers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_matcher_values: Vec<String>,
}

/// Identity resolution result from the vendor.
///
/// `vendor_user_id` stays a raw JSON value: the pipeline enforces the
/// non-empty-string requirement itself and must be able to observe a
/// malformed shape rather than fail deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResult {
    /// The vendor's identifier for the holder.
    pub vendor_user_id: Value,
    /// Any additional fields the vendor returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_omits_unset_fields() {
        let filter = VendorOffersFilter {
            vendor_user_id: None,
            vendor_organization_id: None,
            tenant_did: Did::new("did:ion:tenant"),
            tenant_id: TenantId::new(),
            exchange_id: ExchangeId::new(),
            types: None,
        };
        let value = serde_json::to_value(&filter).unwrap();
        assert!(value.get("vendorUserId").is_none());
        assert!(value.get("types").is_none());
        assert_eq!(value["tenantDid"], "did:ion:tenant");
    }

    #[test]
    fn test_identity_result_preserves_malformed_user_id() {
        let result: IdentityResult =
            serde_json::from_value(json!({"vendorUserId": 42, "name": "Adam"})).unwrap();
        assert_eq!(result.vendor_user_id, json!(42));
        assert_eq!(result.extra["name"], "Adam");
    }
}
