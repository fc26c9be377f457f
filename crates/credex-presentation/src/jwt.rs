//! Unverified JWT payload decoding.
//!
//! The pipeline needs the credential JSON before (or instead of, on the
//! unchecked branch) cryptographic verification. Signature checking is
//! the verifier seam's job; this module only splits and decodes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use credex_core::{codes, CredexError};

/// Decode a JWT's claims without verifying its signature.
///
/// # Errors
///
/// 400 `bad_presentation` when the string is not a three-part JWS or the
/// payload is not base64url JSON.
pub fn decode_claims(jwt: &str) -> Result<Value, CredexError> {
    let mut parts = jwt.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(CredexError::validation(
                codes::BAD_PRESENTATION,
                "credential is not a three-part JWT",
            ));
        }
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        CredexError::validation(
            codes::BAD_PRESENTATION,
            format!("credential payload is not base64url: {e}"),
        )
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        CredexError::validation(
            codes::BAD_PRESENTATION,
            format!("credential payload is not JSON: {e}"),
        )
    })
}

/// Decode a JWT-VC into its credential object.
///
/// Returns the embedded `vc` claim with `issuer` and `id` lifted from the
/// JWT claims when absent, or the full claims object for credentials not
/// using the `vc` envelope.
pub fn decode_credential(jwt: &str) -> Result<Value, CredexError> {
    let claims = decode_claims(jwt)?;
    let Some(vc) = claims.get("vc") else {
        return Ok(claims);
    };
    let mut credential = vc.clone();
    if let Some(obj) = credential.as_object_mut() {
        if !obj.contains_key("issuer") {
            if let Some(iss) = claims.get("iss") {
                obj.insert("issuer".to_string(), iss.clone());
            }
        }
        if !obj.contains_key("id") {
            if let Some(jti) = claims.get("jti") {
                obj.insert("id".to_string(), jti.clone());
            }
        }
    }
    Ok(credential)
}
