//! Share-link authorization
//!
//! - `tokens`: stateless, expiring, HMAC-signed share tokens
//! - `keys`: the signing secret and role-bound API keys
//! - `ttl`: lifetimes callers are allowed to request

mod keys;
mod tokens;
mod ttl;

pub use keys::{ApiKey, ApiKeys, Role, SigningKey, GENERATED_KEY_LEN, TOKEN_SECRET_ENV};
pub use tokens::{AccessToken, InvalidToken, TokenCodec, TokenError, TokenPayload, FIELD_SEPARATOR};
pub use ttl::{TtlHours, DEFAULT_TTL_HOURS, MAX_TTL_HOURS, MIN_TTL_HOURS};
