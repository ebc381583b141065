//! Display-only decoding of access-token claims.
//!
//! The signature is never verified: these claims label the status bar, they
//! do not gate anything.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use super::error::AuthError;

/// Claim keys tried in order for the principal name.
pub const PRINCIPAL_CLAIMS: &[&str] = &["upn", "preferred_username", "unique_name"];

/// Claim key holding the tenant id.
pub const TENANT_CLAIM: &str = "tid";

/// Decode the payload segment of a `header.payload[.signature]` token into its
/// string-valued claims. Non-string values are dropped.
pub fn decode_claims(token: &str) -> Result<HashMap<String, String>, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() < 2 {
        return Err(AuthError::ClaimsDecode(format!(
            "expected at least 2 segments, found {}",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| AuthError::ClaimsDecode(format!("payload is not base64url: {e}")))?;

    let value: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| AuthError::ClaimsDecode(format!("payload is not JSON: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(AuthError::ClaimsDecode(
            "payload is not a JSON object".into(),
        ));
    };

    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

/// First value whose trimmed form is non-empty, trimmed. Empty if none.
pub fn first_non_blank<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Principal name from the priority list of claim keys.
pub fn principal_name(claims: &HashMap<String, String>) -> String {
    let candidates: Vec<&str> = PRINCIPAL_CLAIMS
        .iter()
        .map(|k| claims.get(*k).map_or("", String::as_str))
        .collect();
    first_non_blank(&candidates)
}

pub fn tenant_id(claims: &HashMap<String, String>) -> String {
    claims
        .get(TENANT_CLAIM)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn encode_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}
