//! Service configuration

use crate::auth::{ApiKeys, SigningKey, TokenError, TtlHours, TOKEN_SECRET_ENV};
use std::net::SocketAddr;
use thiserror::Error;

pub const BIND_ENV: &str = "APOLLOVIEW_BIND";
pub const PUBLIC_URL_ENV: &str = "APOLLOVIEW_PUBLIC_URL";
pub const API_KEYS_ENV: &str = "APOLLOVIEW_API_KEYS";
pub const DEFAULT_TTL_ENV: &str = "APOLLOVIEW_DEFAULT_TTL_HOURS";

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000/view";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

impl ConfigError {
    fn invalid(name: &'static str, message: impl ToString) -> Self {
        Self::Invalid {
            name,
            message: message.to_string(),
        }
    }
}

/// Configuration for the share-link service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// Viewer page that share links point at
    pub public_url: String,

    /// Secret for signing share tokens
    pub signing_key: SigningKey,

    /// Keys allowed to call the API, with their roles
    pub api_keys: ApiKeys,

    /// Lifetime used when a request does not ask for one
    pub default_ttl: TtlHours,
}

impl ServiceConfig {
    /// Create a configuration with defaults for everything but the key
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            signing_key,
            api_keys: ApiKeys::new(),
            default_ttl: TtlHours::default(),
        }
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into();
        self
    }

    pub fn api_keys(mut self, keys: ApiKeys) -> Self {
        self.api_keys = keys;
        self
    }

    pub fn default_ttl(mut self, ttl: TtlHours) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Build from `APOLLOVIEW_*` environment variables.
    ///
    /// Only the token secret is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Build from the environment with a signing key supplied by the caller;
    /// `APOLLOVIEW_TOKEN_SECRET` is ignored
    pub fn from_env_with_key(signing_key: SigningKey) -> Result<Self, ConfigError> {
        Self::new(signing_key).apply_lookup(env_var)
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(TOKEN_SECRET_ENV).ok_or(ConfigError::Missing(TOKEN_SECRET_ENV))?;
        let signing_key = SigningKey::new(secret)
            .map_err(|e: TokenError| ConfigError::invalid(TOKEN_SECRET_ENV, e))?;

        Self::new(signing_key).apply_lookup(lookup)
    }

    fn apply_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        self.bind_addr = bind.parse().map_err(|e| ConfigError::invalid(BIND_ENV, e))?;

        if let Some(url) = lookup(PUBLIC_URL_ENV) {
            self.public_url = url;
        }

        if let Some(keys) = lookup(API_KEYS_ENV) {
            self.api_keys =
                ApiKeys::parse(&keys).map_err(|e| ConfigError::invalid(API_KEYS_ENV, e))?;
        }

        if let Some(hours) = lookup(DEFAULT_TTL_ENV) {
            let hours: f64 = hours
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(DEFAULT_TTL_ENV, e))?;
            self.default_ttl =
                TtlHours::new(hours).map_err(|e| ConfigError::invalid(DEFAULT_TTL_ENV, e))?;
        }

        Ok(self)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
