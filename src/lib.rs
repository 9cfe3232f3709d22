//! ApolloView share links
//!
//! Editors hand out QR codes that deep-link viewers to a single portfolio
//! object. Each link carries a stateless, expiring, HMAC-signed token bound to
//! the object's numeric id.

pub mod auth;
pub mod clock;
pub mod config;
pub mod links;
pub mod server;

pub use auth::{
    AccessToken, ApiKey, ApiKeys, InvalidToken, Role, SigningKey, TokenCodec, TokenError,
    TokenPayload, TtlHours,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use links::{extract_token, ShareLink};
