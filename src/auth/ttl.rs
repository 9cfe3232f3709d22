//! Caller-level token lifetimes

use crate::auth::tokens::TokenError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest lifetime a caller may request (six minutes)
pub const MIN_TTL_HOURS: f64 = 0.1;
/// Longest lifetime a caller may request (one week)
pub const MAX_TTL_HOURS: f64 = 168.0;
pub const DEFAULT_TTL_HOURS: f64 = 24.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A share-link lifetime in hours, within `0.1..=168`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TtlHours(f64);

impl TtlHours {
    pub fn new(hours: f64) -> Result<Self, TokenError> {
        if !hours.is_finite() || !(MIN_TTL_HOURS..=MAX_TTL_HOURS).contains(&hours) {
            return Err(TokenError::TtlOutOfRange(hours));
        }
        Ok(Self(hours))
    }

    pub fn hours(&self) -> f64 {
        self.0
    }

    /// Lifetime rounded to whole milliseconds
    pub fn to_duration(&self) -> Duration {
        Duration::milliseconds((self.0 * MILLIS_PER_HOUR).round() as i64)
    }
}

impl Default for TtlHours {
    fn default() -> Self {
        Self(DEFAULT_TTL_HOURS)
    }
}

impl<'de> Deserialize<'de> for TtlHours {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hours = f64::deserialize(deserializer)?;
        TtlHours::new(hours).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TtlHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}
