//! Signing secret and API keys

use crate::auth::tokens::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Environment variable holding the token signing secret
pub const TOKEN_SECRET_ENV: &str = "APOLLOVIEW_TOKEN_SECRET";

/// Bytes of entropy in a generated signing key
pub const GENERATED_KEY_LEN: usize = 32;

/// Secret used to sign share tokens. Read-only once built.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        Ok(Self { bytes })
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; GENERATED_KEY_LEN];
        rng.fill(&mut bytes);

        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// The key rendered as base64url, suitable for an env file
    pub fn encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}

/// What a caller holding an API key may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Browse the catalog
    Viewer,
    /// Manage objects and hand out share links
    Editor,
    /// Everything an editor can do
    Admin,
}

impl Role {
    pub fn can_issue_links(&self) -> bool {
        matches!(self, Role::Editor | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("invalid role: {}. Must be viewer, editor, or admin", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Viewer => write!(f, "viewer"),
            Role::Editor => write!(f, "editor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A bearer API key bound to a role
#[derive(Clone)]
pub struct ApiKey {
    key: String,
    role: Role,
}

impl ApiKey {
    pub fn new(key: impl Into<String>, role: Role) -> Self {
        Self {
            key: key.into(),
            role,
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        presented.as_bytes().ct_eq(self.key.as_bytes()).into()
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}, [REDACTED])", self.role)
    }
}

/// The configured API keys
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: Vec<ApiKey>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn add(&mut self, key: ApiKey) {
        self.keys.push(key);
    }

    /// Parse comma-separated `role:key` entries, e.g. `editor:abc,viewer:def`
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut keys = Self::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (role, key) = entry
                .split_once(':')
                .ok_or_else(|| "API key entries must look like role:key".to_string())?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("empty API key for role {}", role.trim()));
            }
            keys.add(ApiKey::new(key, role.parse()?));
        }

        Ok(keys)
    }

    /// Resolve a presented key to its role.
    ///
    /// Every configured key is compared so the time taken does not depend on
    /// which entry matched.
    pub fn authenticate(&self, presented: &str) -> Option<Role> {
        let mut found = None;
        for key in &self.keys {
            if key.matches(presented) && found.is_none() {
                found = Some(key.role());
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
