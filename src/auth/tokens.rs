//! Share tokens
//!
//! Wire format: `{resourceId}:{expiresAt}:{signature}`
//!
//! - `resourceId`: positive decimal integer
//! - `expiresAt`: expiry in Unix epoch milliseconds
//! - `signature`: base64url (no padding) HMAC-SHA256 of `{resourceId}:{expiresAt}`
//!
//! Tokens are stateless. Nothing is stored server-side and there is no
//! revocation; a token is good until it expires.

use crate::auth::keys::SigningKey;
use crate::clock::{Clock, SystemClock};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Separator between the three token fields
pub const FIELD_SEPARATOR: char = ':';

type HmacSha256 = Hmac<Sha256>;

/// Caller mistakes when issuing tokens or building keys.
///
/// Untrusted input never produces one of these; see [`InvalidToken`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("resource id must be positive")]
    InvalidResourceId,

    #[error("token lifetime must be positive, got {0}ms")]
    NonPositiveTtl(i64),

    #[error("token lifetime must be between 0.1 and 168 hours, got {0}")]
    TtlOutOfRange(f64),

    #[error("token expiry overflows the timestamp range")]
    ExpiryOverflow,

    #[error("signing key must not be empty")]
    EmptyKey,
}

/// A token failed verification.
///
/// Carries no detail: malformed, expired and forged tokens are
/// indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid token")]
pub struct InvalidToken;

/// What a verified token grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub resource_id: u64,
    /// Unix epoch milliseconds
    pub expires_at: i64,
}

impl TokenPayload {
    /// Still usable at `now_millis`; expiry is exclusive
    pub fn is_live_at(&self, now_millis: i64) -> bool {
        self.expires_at > now_millis
    }

    fn signing_input(&self) -> String {
        format!("{}{}{}", self.resource_id, FIELD_SEPARATOR, self.expires_at)
    }
}

/// An issued token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    payload: TokenPayload,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    pub fn resource_id(&self) -> u64 {
        self.payload.resource_id
    }

    pub fn expires_at(&self) -> i64 {
        self.payload.expires_at
    }

    pub fn into_string(self) -> String {
        self.token
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// Issues and verifies share tokens with one signing key
#[derive(Debug, Clone)]
pub struct TokenCodec<C = SystemClock> {
    key: SigningKey,
    clock: C,
}

impl TokenCodec<SystemClock> {
    pub fn new(key: SigningKey) -> Self {
        Self::with_clock(key, SystemClock)
    }
}

impl<C: Clock> TokenCodec<C> {
    pub fn with_clock(key: SigningKey, clock: C) -> Self {
        Self { key, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Issue a token for `resource_id` that expires `ttl` from now
    pub fn issue(&self, resource_id: u64, ttl: Duration) -> Result<AccessToken, TokenError> {
        self.issue_at(resource_id, ttl, self.clock.now_millis())
    }

    /// Issue a token as if the current time were `now_millis`
    pub fn issue_at(
        &self,
        resource_id: u64,
        ttl: Duration,
        now_millis: i64,
    ) -> Result<AccessToken, TokenError> {
        if resource_id == 0 {
            return Err(TokenError::InvalidResourceId);
        }

        let ttl_millis = ttl.num_milliseconds();
        if ttl_millis <= 0 {
            return Err(TokenError::NonPositiveTtl(ttl_millis));
        }

        let expires_at = now_millis
            .checked_add(ttl_millis)
            .ok_or(TokenError::ExpiryOverflow)?;

        let payload = TokenPayload {
            resource_id,
            expires_at,
        };
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));

        let token = format!("{}{}{}", payload.signing_input(), FIELD_SEPARATOR, signature);

        Ok(AccessToken { token, payload })
    }

    /// Verify an untrusted token string against the current time
    pub fn verify(&self, token: &str) -> Result<TokenPayload, InvalidToken> {
        self.verify_at(token, self.clock.now_millis())
    }

    /// Verify as if the current time were `now_millis`
    pub fn verify_at(&self, token: &str, now_millis: i64) -> Result<TokenPayload, InvalidToken> {
        let result = self.check(token, now_millis);
        if let Err(reason) = &result {
            debug!(reason = *reason, token_len = token.len(), "Rejected share token");
        }
        result.map_err(|_| InvalidToken)
    }

    /// Full verification; the `&str` is a log-only reason, never shown to callers
    fn check(&self, token: &str, now_millis: i64) -> Result<TokenPayload, &'static str> {
        let mut fields = token.split(FIELD_SEPARATOR);
        let (Some(id_field), Some(expiry_field), Some(signature_field), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err("wrong field count");
        };

        let resource_id = parse_canonical::<u64>(id_field)
            .filter(|id| *id > 0)
            .ok_or("bad resource id")?;
        let expires_at = parse_canonical::<i64>(expiry_field).ok_or("bad expiry")?;

        let provided = URL_SAFE_NO_PAD
            .decode(signature_field)
            .map_err(|_| "bad signature encoding")?;

        let payload = TokenPayload {
            resource_id,
            expires_at,
        };

        // Signature first, so expired and forged tokens take the same path
        let mut mac = self.mac();
        mac.update(payload.signing_input().as_bytes());
        mac.verify_slice(&provided).map_err(|_| "signature mismatch")?;

        if !payload.is_live_at(now_millis) {
            return Err("expired");
        }

        Ok(payload)
    }

    fn sign(&self, payload: &TokenPayload) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload.signing_input().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.as_bytes()).expect("HMAC can take key of any size")
    }
}

/// Parse a decimal integer, accepting only its canonical rendering
/// (no sign, no leading zeros, no whitespace)
fn parse_canonical<T>(field: &str) -> Option<T>
where
    T: FromStr + ToString,
{
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = field.parse::<T>().ok()?;
    if value.to_string() != field {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-signing";
    const T: i64 = 1_700_000_000_000;

    fn codec() -> TokenCodec<ManualClock> {
        TokenCodec::with_clock(SigningKey::new(TEST_SECRET).unwrap(), ManualClock::new(T))
    }

    fn resign(codec: &TokenCodec<ManualClock>, resource_id: u64, expires_at: i64) -> String {
        let payload = TokenPayload {
            resource_id,
            expires_at,
        };
        format!(
            "{}:{}",
            payload.signing_input(),
            URL_SAFE_NO_PAD.encode(codec.sign(&payload))
        )
    }

    #[test]
    fn test_issue_verify_scenario() {
        let codec = codec();
        let token = codec.issue(42, Duration::hours(1)).unwrap();

        let expected_prefix = format!("42:{}:", T + 3_600_000);
        assert!(token.as_str().starts_with(&expected_prefix));
        assert_eq!(token.expires_at(), T + 3_600_000);

        codec.clock().set(T + 1_000);
        let payload = codec.verify(token.as_str()).unwrap();
        assert_eq!(
            payload,
            TokenPayload {
                resource_id: 42,
                expires_at: T + 3_600_000
            }
        );

        codec.clock().set(T + 3_600_001);
        assert_eq!(codec.verify(token.as_str()), Err(InvalidToken));
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let codec = codec();
        let token = codec.issue(7, Duration::milliseconds(500)).unwrap();

        assert!(codec.verify_at(token.as_str(), T + 499).is_ok());
        assert_eq!(codec.verify_at(token.as_str(), T + 500), Err(InvalidToken));
    }

    #[test]
    fn test_signature_is_unpadded_base64url() {
        let token = codec().issue(1, Duration::minutes(5)).unwrap();
        let signature = token.as_str().rsplit(':').next().unwrap();

        // 32-byte digest -> 43 base64 characters without padding
        assert_eq!(signature.len(), 43);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_known_signature_vector() {
        let codec = codec();
        let token = codec.issue_at(42, Duration::hours(1), T).unwrap();

        let mut mac = HmacSha256::new_from_slice(TEST_SECRET).unwrap();
        mac.update(format!("42:{}", T + 3_600_000).as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(
            token.as_str(),
            format!("42:{}:{}", T + 3_600_000, expected)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = codec();
        let token = codec.issue(42, Duration::hours(1)).unwrap().into_string();
        let sig_start = token.rfind(':').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(codec.verify(&tampered), Err(InvalidToken), "index {}", i);
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = codec.issue(42, Duration::hours(1)).unwrap().into_string();

        let swapped_id = token.replacen("42:", "43:", 1);
        assert_eq!(codec.verify(&swapped_id), Err(InvalidToken));

        let sig = token.rsplit(':').next().unwrap();
        let extended = format!("42:{}:{}", T + 7_200_000, sig);
        assert_eq!(codec.verify(&extended), Err(InvalidToken));
    }

    #[test]
    fn test_expired_but_correctly_signed_rejected() {
        let codec = codec();
        let expired = resign(&codec, 42, T - 1);
        assert_eq!(codec.verify(&expired), Err(InvalidToken));

        let live = resign(&codec, 42, T + 1);
        assert!(codec.verify(&live).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = codec().issue(42, Duration::hours(1)).unwrap();
        let other = TokenCodec::with_clock(
            SigningKey::new("another-secret").unwrap(),
            ManualClock::new(T),
        );
        assert_eq!(other.verify(token.as_str()), Err(InvalidToken));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        let codec = codec();
        for input in ["", "abc", "1:2", "1:2:3:4", "::", ":::", "abc:123:sig"] {
            assert_eq!(codec.verify(input), Err(InvalidToken), "{:?}", input);
        }
    }

    #[test]
    fn test_non_canonical_numbers_rejected() {
        let codec = codec();
        let good = resign(&codec, 42, T + 60_000);
        let sig = good.rsplit(':').next().unwrap();

        for id in ["042", "+42", " 42", "42 ", "-42", "0", "4.2e1"] {
            let token = format!("{}:{}:{}", id, T + 60_000, sig);
            assert_eq!(codec.verify(&token), Err(InvalidToken), "{:?}", id);
        }
        let padded_expiry = format!("42:0{}:{}", T + 60_000, sig);
        assert_eq!(codec.verify(&padded_expiry), Err(InvalidToken));
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        let codec = codec();
        let token = format!("18446744073709551616:{}:AAAA", T + 1);
        assert_eq!(codec.verify(&token), Err(InvalidToken));

        let token = "1:9223372036854775808:AAAA";
        assert_eq!(codec.verify(token), Err(InvalidToken));
    }

    #[test]
    fn test_max_resource_id_round_trips() {
        let codec = codec();
        let token = codec.issue(u64::MAX, Duration::hours(1)).unwrap();
        assert_eq!(codec.verify(token.as_str()).unwrap().resource_id, u64::MAX);
    }

    #[test]
    fn test_bad_signature_encoding_rejected() {
        let codec = codec();
        let good = codec.issue(42, Duration::hours(1)).unwrap().into_string();
        let prefix = good.rsplit_once(':').unwrap().0;

        for sig in ["", "!!!!", "a+b/c=", "AAAA"] {
            let token = format!("{}:{}", prefix, sig);
            assert_eq!(codec.verify(&token), Err(InvalidToken), "{:?}", sig);
        }
    }

    #[test]
    fn test_issue_rejects_programmer_errors() {
        let codec = codec();
        assert_eq!(
            codec.issue(0, Duration::hours(1)),
            Err(TokenError::InvalidResourceId)
        );
        assert_eq!(
            codec.issue(1, Duration::zero()),
            Err(TokenError::NonPositiveTtl(0))
        );
        assert_eq!(
            codec.issue(1, Duration::hours(-1)),
            Err(TokenError::NonPositiveTtl(-3_600_000))
        );
        assert_eq!(
            codec.issue_at(1, Duration::hours(1), i64::MAX),
            Err(TokenError::ExpiryOverflow)
        );
    }

    #[test]
    fn test_codec_has_no_upper_ttl_bound() {
        let token = codec().issue(1, Duration::days(3650)).unwrap();
        assert_eq!(token.expires_at(), T + 3650 * 86_400_000);
    }

    #[test]
    fn test_different_expiry_different_signature() {
        let codec = codec();
        let a = codec.issue(42, Duration::hours(1)).unwrap().into_string();
        codec.clock().advance(1);
        let b = codec.issue(42, Duration::hours(1)).unwrap().into_string();

        assert_ne!(a.rsplit(':').next(), b.rsplit(':').next());
    }

    #[test]
    fn test_invalid_token_display_is_uniform() {
        assert_eq!(InvalidToken.to_string(), "invalid token");
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = TokenPayload {
            resource_id: 42,
            expires_at: 1000,
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"resourceId":42,"expiresAt":1000}"#
        );
    }

    #[test]
    fn test_parse_canonical() {
        assert_eq!(parse_canonical::<u64>("0"), Some(0));
        assert_eq!(parse_canonical::<u64>("123"), Some(123));
        assert_eq!(parse_canonical::<u64>("0123"), None);
        assert_eq!(parse_canonical::<u64>(""), None);
        assert_eq!(parse_canonical::<i64>("-5"), None);
        assert_eq!(parse_canonical::<u64>("١٢"), None);
    }
}
