//! # Offer Validator
//!
//! Validates one raw vendor-or-preloaded offer object against the
//! vendor-offer schema, the temporal-field exclusivity rule, the
//! disclosure's commercial-entity branding, and the credential type's own
//! subject schema. Returns a validated copy; never mutates the input.

use serde_json::Value;

use credex_core::{codes, CredexError, EngineConfig};
use credex_exchange::Disclosure;
use credex_schema::SchemaRegistry;

use crate::offer::VENDOR_USER_ID_FIELD;

/// Read-only context for offer validation.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The disclosure the exchange runs under.
    pub disclosure: &'a Disclosure,
    /// Engine configuration.
    pub config: &'a EngineConfig,
    /// Compiled schema validators.
    pub registry: &'a SchemaRegistry,
}

/// Validate a raw offer object.
///
/// `is_validate_vendor_offer` controls the vendor-offer envelope schema
/// check. Subject-schema validation follows
/// `config.enable_offer_validation` unless
/// `force_credential_subject_validation` overrides it; the vendor push
/// path always forces it because pushed offers are persisted directly.
///
/// Returns the validated offer with `vendorUserId` re-attached after the
/// subject passed its type schema without it.
///
/// # Errors
///
/// All failures are 400 validation errors carrying the machine code for
/// the violated rule.
pub fn validate_offer(
    raw: &Value,
    is_validate_vendor_offer: bool,
    force_credential_subject_validation: bool,
    ctx: &ValidationContext<'_>,
) -> Result<Value, CredexError> {
    if is_validate_vendor_offer {
        ctx.registry
            .validate_vendor_offer(raw)
            .map_err(|e| CredexError::validation(codes::BAD_VENDOR_OFFER, e.to_string()))?;
    }

    if raw.get("expirationDate").is_some() && raw.get("validUntil").is_some() {
        return Err(CredexError::validation(
            codes::CONFLICTING_EXPIRATION,
            "expirationDate and validUntil are mutually exclusive",
        ));
    }

    check_commercial_entity(raw, ctx.disclosure)?;

    let mut offer = raw.clone();
    if ctx.config.enable_offer_validation || force_credential_subject_validation {
        validate_subject(&mut offer, ctx.registry)?;
    }
    Ok(offer)
}

/// Branded issuance: the offer's issuer name/logo must match the
/// disclosure's commercial entity exactly.
fn check_commercial_entity(raw: &Value, disclosure: &Disclosure) -> Result<(), CredexError> {
    let issuer = raw.get("issuer");
    if let Some(expected_name) = &disclosure.commercial_entity_name {
        let name = issuer.and_then(|i| i.get("name")).and_then(Value::as_str);
        if name != Some(expected_name.as_str()) {
            return Err(CredexError::validation(
                codes::INVALID_COMMERCIAL_ENTITY,
                format!("offer issuer name does not match commercial entity {expected_name:?}"),
            ));
        }
    }
    if let Some(expected_logo) = &disclosure.commercial_entity_logo {
        let image = issuer.and_then(|i| i.get("image")).and_then(Value::as_str);
        if image != Some(expected_logo.as_str()) {
            return Err(CredexError::validation(
                codes::INVALID_COMMERCIAL_ENTITY,
                "offer issuer image does not match the commercial entity logo",
            ));
        }
    }
    Ok(())
}

/// Validate the credential subject against each credential type's schema,
/// with the platform-internal `vendorUserId` stripped, then re-attach it.
fn validate_subject(offer: &mut Value, registry: &SchemaRegistry) -> Result<(), CredexError> {
    let Some(subject) = offer.get_mut("credentialSubject").and_then(Value::as_object_mut) else {
        return Err(CredexError::validation(
            codes::BAD_CREDENTIAL_SUBJECT,
            "credentialSubject must be an object",
        ));
    };
    let vendor_user_id = subject.remove(VENDOR_USER_ID_FIELD);
    let subject_value = Value::Object(subject.clone());

    let types: Vec<String> = offer
        .get("type")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut result = Ok(());
    for credential_type in &types {
        if let Err(e) = registry.validate_subject(credential_type, &subject_value) {
            result = Err(CredexError::validation(codes::BAD_CREDENTIAL_SUBJECT, e.to_string()));
            break;
        }
    }

    // Re-attach even when validation failed: the offer value is reported
    // back to the caller intact.
    if let Some(id) = vendor_user_id {
        if let Some(subject) = offer.get_mut("credentialSubject").and_then(Value::as_object_mut) {
            subject.insert(VENDOR_USER_ID_FIELD.to_string(), id);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use credex_core::{DisclosureId, TenantId};
    use credex_exchange::VendorEndpoint;
    use serde_json::json;

    fn disclosure() -> Disclosure {
        Disclosure {
            id: DisclosureId::new(),
            tenant_id: TenantId::new(),
            vendor_endpoint: VendorEndpoint::IssuingIdentification,
            offer_mode: None,
            identity_matchers: None,
            commercial_entity_name: None,
            commercial_entity_logo: None,
            credential_types: None,
            vendor_organization_id: None,
            send_push_on_verification: false,
            payment_required: false,
        }
    }

    fn registry_with_email_schema() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new().unwrap();
        registry
            .register_subject_schema(
                "EmailV1.0",
                &json!({
                    "type": "object",
                    "properties": { "email": { "type": "string" } },
                    "required": ["email"],
                    "additionalProperties": false
                }),
            )
            .unwrap();
        registry
    }

    fn raw_offer() -> Value {
        json!({
            "offerId": "o-1",
            "type": ["EmailV1.0"],
            "issuer": { "id": "did:ion:issuer", "name": "Acme", "image": "https://acme/logo.png" },
            "credentialSubject": {
                "vendorUserId": "adam@x.com",
                "email": "adam@x.com"
            }
        })
    }

    #[test]
    fn test_valid_offer_passes_and_is_returned() {
        let disclosure = disclosure();
        let config = EngineConfig::default();
        let registry = registry_with_email_schema();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let validated = validate_offer(&raw_offer(), true, false, &ctx).unwrap();
        // vendorUserId survives the strip/re-attach round trip.
        assert_eq!(validated["credentialSubject"]["vendorUserId"], "adam@x.com");
    }

    #[test]
    fn test_conflicting_expiration_fields() {
        let disclosure = disclosure();
        let config = EngineConfig::default();
        let registry = SchemaRegistry::new().unwrap();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let mut offer = raw_offer();
        offer["expirationDate"] = json!("2030-01-01T00:00:00Z");
        offer["validUntil"] = json!("2031-01-01T00:00:00Z");
        let err = validate_offer(&offer, true, false, &ctx).unwrap_err();
        assert_eq!(err.code(), Some(codes::CONFLICTING_EXPIRATION));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_commercial_entity_mismatch() {
        let mut disclosure = disclosure();
        disclosure.commercial_entity_name = Some("Globex".to_string());
        let config = EngineConfig::default();
        let registry = SchemaRegistry::new().unwrap();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let err = validate_offer(&raw_offer(), true, false, &ctx).unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_COMMERCIAL_ENTITY));
    }

    #[test]
    fn test_commercial_entity_match_passes() {
        let mut disclosure = disclosure();
        disclosure.commercial_entity_name = Some("Acme".to_string());
        disclosure.commercial_entity_logo = Some("https://acme/logo.png".to_string());
        let config = EngineConfig::default();
        let registry = SchemaRegistry::new().unwrap();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        assert!(validate_offer(&raw_offer(), true, false, &ctx).is_ok());
    }

    #[test]
    fn test_string_issuer_fails_branded_disclosure() {
        let mut disclosure = disclosure();
        disclosure.commercial_entity_name = Some("Acme".to_string());
        let config = EngineConfig::default();
        let registry = SchemaRegistry::new().unwrap();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let mut offer = raw_offer();
        offer["issuer"] = json!("did:ion:issuer");
        let err = validate_offer(&offer, true, false, &ctx).unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_COMMERCIAL_ENTITY));
    }

    #[test]
    fn test_subject_schema_rejects_vendor_user_id_leak() {
        // With additionalProperties false, the subject only passes because
        // vendorUserId is stripped before validation.
        let disclosure = disclosure();
        let config = EngineConfig::default();
        let registry = registry_with_email_schema();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        assert!(validate_offer(&raw_offer(), true, false, &ctx).is_ok());
    }

    #[test]
    fn test_bad_subject_fails() {
        let disclosure = disclosure();
        let config = EngineConfig::default();
        let registry = registry_with_email_schema();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let mut offer = raw_offer();
        offer["credentialSubject"] =
            json!({"vendorUserId": "adam@x.com", "phone": "555-0100"});
        let err = validate_offer(&offer, false, false, &ctx).unwrap_err();
        assert_eq!(err.code(), Some(codes::BAD_CREDENTIAL_SUBJECT));
    }

    #[test]
    fn test_subject_validation_skippable_but_forceable() {
        let disclosure = disclosure();
        let mut config = EngineConfig::default();
        config.enable_offer_validation = false;
        let registry = registry_with_email_schema();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let mut offer = raw_offer();
        offer["credentialSubject"] =
            json!({"vendorUserId": "adam@x.com", "phone": "555-0100"});

        // Disabled validation lets the bad subject through.
        assert!(validate_offer(&offer, false, false, &ctx).is_ok());
        // The force flag re-enables it for the push path.
        assert!(validate_offer(&offer, false, true, &ctx).is_err());
    }

    #[test]
    fn test_schema_failure_is_bad_vendor_offer() {
        let disclosure = disclosure();
        let config = EngineConfig::default();
        let registry = SchemaRegistry::new().unwrap();
        let ctx = ValidationContext { disclosure: &disclosure, config: &config, registry: &registry };

        let offer = json!({"offerId": "o-1"});
        let err = validate_offer(&offer, true, false, &ctx).unwrap_err();
        assert_eq!(err.code(), Some(codes::BAD_VENDOR_OFFER));
    }
}
