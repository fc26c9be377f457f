//! # Schema Registry
//!
//! Compiles and caches `jsonschema` validators: one for the embedded
//! vendor-offer schema, plus one per registered credential type for
//! subject validation.

use std::collections::HashMap;
use std::fmt;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

/// The vendor-offer schema shipped with the engine.
const VENDOR_OFFER_SCHEMA: &str = include_str!("../schemas/vendor-offer.schema.json");

/// A single validation violation with its location in the instance.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Error during schema registration or validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}': {}",
        violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Every violation found in the instance.
        violations: Vec<Violation>,
    },

    /// The compiled validator could not be built (invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema name or credential type.
        schema_name: String,
        /// Reason the validator could not be compiled.
        reason: String,
    },
}

/// Registry of compiled schema validators.
///
/// `SchemaRegistry` is `Send + Sync`; compiled validators are shared
/// across request tasks. Registration happens at startup when the
/// credential-type registry is loaded.
pub struct SchemaRegistry {
    vendor_offer: Validator,
    subjects: HashMap<String, Validator>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("subject_schemas", &self.subjects.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaRegistry {
    /// Create a registry with the embedded vendor-offer schema compiled
    /// and no subject schemas registered yet.
    ///
    /// # Errors
    ///
    /// Returns `ValidatorBuildError` if the embedded schema fails to
    /// compile, which indicates a packaging defect.
    pub fn new() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(VENDOR_OFFER_SCHEMA).map_err(|e| {
            SchemaError::ValidatorBuildError {
                schema_name: "vendor-offer".to_string(),
                reason: format!("embedded schema is not valid JSON: {e}"),
            }
        })?;
        let vendor_offer = build_validator("vendor-offer", &schema)?;
        Ok(Self { vendor_offer, subjects: HashMap::new() })
    }

    /// Register (or replace) the subject schema for a credential type.
    ///
    /// # Errors
    ///
    /// Returns `ValidatorBuildError` if the schema cannot be compiled.
    pub fn register_subject_schema(
        &mut self,
        credential_type: &str,
        schema: &Value,
    ) -> Result<(), SchemaError> {
        let validator = build_validator(credential_type, schema)?;
        self.subjects.insert(credential_type.to_string(), validator);
        Ok(())
    }

    /// Whether a subject schema is registered for the given type.
    pub fn has_subject_schema(&self, credential_type: &str) -> bool {
        self.subjects.contains_key(credential_type)
    }

    /// Validate a raw vendor offer against the vendor-offer schema.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing every violation.
    pub fn validate_vendor_offer(&self, instance: &Value) -> Result<(), SchemaError> {
        run_validator(&self.vendor_offer, "vendor-offer", instance)
    }

    /// Validate a credential subject against its type's schema.
    ///
    /// Types without a registered schema pass: the credential-type
    /// registry owns which types carry subject schemas, and absence means
    /// there is nothing to enforce.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing every violation.
    pub fn validate_subject(
        &self,
        credential_type: &str,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        match self.subjects.get(credential_type) {
            Some(validator) => run_validator(validator, credential_type, instance),
            None => Ok(()),
        }
    }
}

/// Compile a Draft 2020-12 validator for a schema value.
fn build_validator(name: &str, schema: &Value) -> Result<Validator, SchemaError> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(schema).map_err(|e| SchemaError::ValidatorBuildError {
        schema_name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Run a compiled validator, collecting every violation.
fn run_validator(
    validator: &Validator,
    schema_name: &str,
    instance: &Value,
) -> Result<(), SchemaError> {
    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::ValidationFailed { schema_name: schema_name.to_string(), violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_offer() -> Value {
        json!({
            "type": ["EmailV1.0"],
            "offerId": "vendor-123",
            "issuer": { "id": "did:ion:issuer" },
            "credentialSubject": {
                "vendorUserId": "adam.smith@example.com",
                "email": "adam.smith@example.com"
            }
        })
    }

    #[test]
    fn test_valid_vendor_offer_passes() {
        let registry = SchemaRegistry::new().unwrap();
        assert!(registry.validate_vendor_offer(&valid_offer()).is_ok());
    }

    #[test]
    fn test_string_issuer_passes() {
        let registry = SchemaRegistry::new().unwrap();
        let mut offer = valid_offer();
        offer["issuer"] = json!("did:ion:issuer");
        assert!(registry.validate_vendor_offer(&offer).is_ok());
    }

    #[test]
    fn test_missing_type_fails() {
        let registry = SchemaRegistry::new().unwrap();
        let mut offer = valid_offer();
        offer.as_object_mut().unwrap().remove("type");
        let err = registry.validate_vendor_offer(&offer).unwrap_err();
        assert!(matches!(err, SchemaError::ValidationFailed { .. }));
    }

    #[test]
    fn test_missing_vendor_user_id_fails() {
        let registry = SchemaRegistry::new().unwrap();
        let mut offer = valid_offer();
        offer["credentialSubject"].as_object_mut().unwrap().remove("vendorUserId");
        assert!(registry.validate_vendor_offer(&offer).is_err());
    }

    #[test]
    fn test_offer_id_is_optional_at_schema_level() {
        // Missing offerId is handled by the loader as a fatal integrity
        // violation, not as a schema error.
        let registry = SchemaRegistry::new().unwrap();
        let mut offer = valid_offer();
        offer.as_object_mut().unwrap().remove("offerId");
        assert!(registry.validate_vendor_offer(&offer).is_ok());
    }

    #[test]
    fn test_subject_schema_registration_and_validation() {
        let mut registry = SchemaRegistry::new().unwrap();
        registry
            .register_subject_schema(
                "EmailV1.0",
                &json!({
                    "type": "object",
                    "properties": { "email": { "type": "string", "format": "email" } },
                    "required": ["email"],
                    "additionalProperties": false
                }),
            )
            .unwrap();

        assert!(registry.validate_subject("EmailV1.0", &json!({"email": "a@x.com"})).is_ok());
        let err = registry.validate_subject("EmailV1.0", &json!({"phone": "123"})).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("EmailV1.0"));
    }

    #[test]
    fn test_unregistered_subject_type_passes() {
        let registry = SchemaRegistry::new().unwrap();
        assert!(registry.validate_subject("UnknownType", &json!({"x": 1})).is_ok());
    }

    #[test]
    fn test_violation_messages_carry_paths() {
        let registry = SchemaRegistry::new().unwrap();
        let mut offer = valid_offer();
        offer["type"] = json!([]);
        match registry.validate_vendor_offer(&offer) {
            Err(SchemaError::ValidationFailed { violations, .. }) => {
                assert!(!violations.is_empty());
                assert!(violations.iter().any(|v| v.instance_path.contains("type")));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
