//! Access-token claim helpers.
//!
//! Tokens are JWTs decoded on the client for their `exp` and `sub` claims
//! only; the signature is never checked here. Decode failures are returned
//! to the caller, which decides whether that means "not authenticated".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Token decode error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not three dot-separated segments, bad base64, or a non-JSON payload
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Payload lacks a claim or has it with the wrong type
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
}

pub type TokenResult<T> = Result<T, TokenError>;

fn decode_payload(token: &str) -> TokenResult<JsonValue> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("payload: {e}")))
}

/// Seconds until `token` expires at time `now`, minus `skew_secs`, floored at zero.
pub fn seconds_until_expire(token: &str, skew_secs: u64, now: i64) -> TokenResult<u64> {
    let claims = decode_payload(token)?;
    let exp = claims
        .get("exp")
        .and_then(JsonValue::as_i64)
        .ok_or(TokenError::MissingClaim("exp"))?;

    let skew = i64::try_from(skew_secs).unwrap_or(i64::MAX);
    let remaining = exp.saturating_sub(skew).saturating_sub(now);
    Ok(u64::try_from(remaining).unwrap_or(0))
}

/// The token's subject (the username).
pub fn get_subject(token: &str) -> TokenResult<String> {
    let claims = decode_payload(token)?;
    claims
        .get("sub")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or(TokenError::MissingClaim("sub"))
}

/// True when the token decodes and has any life left; decode errors read as invalid.
pub fn is_token_valid(token: &str, now: i64) -> bool {
    matches!(seconds_until_expire(token, 0, now), Ok(secs) if secs > 0)
}

#[cfg(test)]
pub(crate) fn make_token(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": sub, "exp": exp }).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_seconds_until_expire() {
        let token = make_token("ana", NOW + 300);
        assert_eq!(seconds_until_expire(&token, 0, NOW).unwrap(), 300);
        assert_eq!(seconds_until_expire(&token, 120, NOW).unwrap(), 180);
    }

    #[test]
    fn test_expired_token_floors_at_zero() {
        let token = make_token("ana", NOW - 10);
        assert_eq!(seconds_until_expire(&token, 0, NOW).unwrap(), 0);
        assert!(!is_token_valid(&token, NOW));
    }

    #[test]
    fn test_skew_larger_than_remaining_floors_at_zero() {
        let token = make_token("ana", NOW + 30);
        assert_eq!(seconds_until_expire(&token, 60, NOW).unwrap(), 0);
    }

    #[test]
    fn test_get_subject() {
        let token = make_token("ana", NOW + 60);
        assert_eq!(get_subject(&token).unwrap(), "ana");
    }

    #[test]
    fn test_padded_payload_is_tolerated() {
        let token = make_token("bo", NOW + 60);
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push_str("==");
        let padded = parts.join(".");
        assert_eq!(get_subject(&padded).unwrap(), "bo");
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!(matches!(
            seconds_until_expire("only.two", 0, NOW),
            Err(TokenError::Malformed(_))
        ));
        assert!(!is_token_valid("garbage", NOW));
    }

    #[test]
    fn test_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        let token = format!("h.{payload}.s");
        assert!(matches!(get_subject(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_missing_claims() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"exp":"soon"}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(
            seconds_until_expire(&token, 0, NOW),
            Err(TokenError::MissingClaim("exp"))
        );
        assert_eq!(get_subject(&token), Err(TokenError::MissingClaim("sub")));
    }
}
