//! # Identity-Matcher Evaluation
//!
//! Matches presented credentials against the identity values stored on an
//! exchange, using the disclosure's matcher rules. Rule paths are plain
//! dotted member paths (`$.a.b`); that is all disclosure configurations
//! use, so no path-query engine is involved.

use serde_json::Value;

use credex_core::{codes, CredexError, VendorUserId};
use credex_exchange::{IdentityMatchers, MatcherRule};

/// Extract the value at a `$.a.b` style path, `None` when any segment is
/// missing. Array values are returned whole; rules decide how to treat
/// their items.
pub fn extract_path<'a>(credential: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").or_else(|| path.strip_prefix('$'))?;
    let mut current = credential;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Evaluate one matcher rule against a credential.
///
/// - `pick`: case-insensitive membership/substring test of the target
///   value against the extracted value(s). An extracted array matches
///   when any item contains the target; a string matches when it contains
///   the target.
/// - `all`: the extracted value must be a non-empty array in which every
///   item case-insensitively equals the target.
///
/// # Errors
///
/// Any other rule name is a disclosure configuration error, surfaced as
/// 500 `unknown_identity_matcher_rule`.
pub fn eval_rule(
    rule: &MatcherRule,
    credential: &Value,
    stored_values: &[String],
) -> Result<bool, CredexError> {
    let Some(target) = stored_values.get(rule.value_index) else {
        return Ok(false);
    };
    let target = target.to_lowercase();

    let extracted: Vec<&Value> =
        rule.path.iter().filter_map(|p| extract_path(credential, p)).collect();

    match rule.rule.as_str() {
        "pick" => Ok(extracted.iter().any(|value| pick_matches(value, &target))),
        "all" => Ok(extracted.iter().any(|value| all_match(value, &target))),
        other => Err(CredexError::internal(
            codes::UNKNOWN_MATCHER_RULE,
            format!("unknown identity matcher rule {other:?}"),
        )),
    }
}

fn pick_matches(value: &Value, target: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(target),
        Value::Array(items) => items.iter().any(|item| pick_matches(item, target)),
        _ => false,
    }
}

fn all_match(value: &Value, target: &str) -> bool {
    match value {
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .all(|item| item.as_str().is_some_and(|s| s.to_lowercase() == target)),
        _ => false,
    }
}

/// Match presented credentials against one exchange's stored identity
/// values.
///
/// Every rule must be satisfied by at least one credential. On a match,
/// returns the stored value at the matchers' `vendor_user_id_index` as
/// the vendor user id.
pub fn match_identity(
    matchers: &IdentityMatchers,
    credentials: &[Value],
    stored_values: &[String],
) -> Result<Option<VendorUserId>, CredexError> {
    if stored_values.is_empty() {
        return Ok(None);
    }
    for rule in &matchers.rules {
        let mut satisfied = false;
        for credential in credentials {
            if eval_rule(rule, credential, stored_values)? {
                satisfied = true;
                break;
            }
        }
        if !satisfied {
            return Ok(None);
        }
    }
    Ok(stored_values
        .get(matchers.vendor_user_id_index)
        .map(|v| VendorUserId::new(v.as_str())))
}
