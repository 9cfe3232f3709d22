//! Share links
//!
//! A share link is the viewer URL with the token appended as the `token`
//! query parameter. This is what ends up encoded in a QR code.

use crate::auth::AccessToken;
use serde::Serialize;
use std::fmt;

/// Query parameter carrying the token
pub const TOKEN_PARAM: &str = "token";

/// A viewer URL carrying a share token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShareLink {
    url: String,
}

impl ShareLink {
    /// Append the token to `base_url`.
    ///
    /// Token characters (digits, `:`, base64url) are all legal in a query
    /// string, so no escaping is applied.
    pub fn new(base_url: &str, token: &AccessToken) -> Self {
        let (base, fragment) = match base_url.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (base_url, None),
        };

        let separator = if !base.contains('?') {
            "?"
        } else if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        };

        let mut url = format!("{}{}{}={}", base, separator, TOKEN_PARAM, token.as_str());
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        Self { url }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Pull the `token` value out of a URL, a query string, or return a bare
/// token unchanged.
///
/// Query values are percent-decoded the same way the HTTP `Query` extractor
/// decodes them, so `42%3A...` and `42:...` resolve alike. Otherwise the value
/// is returned as found; it is up to the codec to reject it.
pub fn extract_token(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let without_fragment = input.split('#').next().unwrap_or(input);
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None if without_fragment.contains('=') => without_fragment,
        // A URL with no query carries no token
        None if without_fragment.contains('/') => return None,
        None => return Some(without_fragment.to_string()),
    };

    form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
