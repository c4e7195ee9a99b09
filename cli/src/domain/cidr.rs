//! Caller address validation.
//!
//! Pure functions only — no I/O, no async, no network access.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ResolutionError;

/// Four dot-separated groups of one to three ASCII decimal digits, nothing else.
/// Surrounding whitespace is rejected, not trimmed.
static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\z")
        .unwrap_or_else(|e| unreachable!("DOTTED_QUAD is a valid pattern: {e}"))
});

/// A single-host IPv4 CIDR (`a.b.c.d/32`) naming the caller's public address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerCidr(String);

impl CallerCidr {
    /// Validate the raw text returned by an IP-echo service and render it as a
    /// `/32` CIDR.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::MalformedAddress`] carrying the raw response
    /// when it is not exactly four dot-separated decimal groups.
    pub fn from_echo_response(raw: &str) -> Result<Self, ResolutionError> {
        if !DOTTED_QUAD.is_match(raw) {
            return Err(ResolutionError::MalformedAddress {
                raw: raw.to_string(),
            });
        }
        Ok(Self(format!("{raw}/32")))
    }

    /// The CIDR text, e.g. `198.51.100.5/32`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address portion without the prefix length.
    #[must_use]
    pub fn address(&self) -> &str {
        self.0.trim_end_matches("/32")
    }
}

impl fmt::Display for CallerCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
