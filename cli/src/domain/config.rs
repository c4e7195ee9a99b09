//! Domain types and validators for ingress-ssh configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "defaults.user",
    "defaults.region",
    "defaults.profile",
    "identity.echo_url",
    "ssh.program",
];

/// Conventional login user of Amazon Linux images.
pub const DEFAULT_USER: &str = "ec2-user";
pub const DEFAULT_REGION: &str = "us-west-1";
/// Returns the bare address with no trailing newline.
pub const DEFAULT_ECHO_URL: &str = "https://ipecho.net/plain";
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";

static REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[a-z]{2}(-[a-z]+)+-[0-9]+\z")
        .unwrap_or_else(|e| unreachable!("REGION_PATTERN is a valid pattern: {e}"))
});

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.ingress-ssh/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct IngressConfig {
    /// Connection defaults, overridable per invocation.
    pub defaults: DefaultsConfig,
    /// Caller address discovery.
    pub identity: IdentityConfig,
    /// SSH client invocation.
    pub ssh: SshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Remote login user.
    pub user: String,
    /// AWS region of the target instances.
    pub region: String,
    /// Named AWS profile; `None` uses the ambient credential chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            region: DEFAULT_REGION.to_string(),
            profile: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Plain-text IP-echo endpoint.
    pub echo_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            echo_url: DEFAULT_ECHO_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    /// SSH client binary.
    pub program: String,
    /// Extra options inserted before the destination, e.g. `["-o", "ServerAliveInterval=30"]`.
    pub extra_args: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SSH_PROGRAM.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl IngressConfig {
    /// Apply a validated `key = value` setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "defaults.user" => self.defaults.user = value.to_string(),
            "defaults.region" => self.defaults.region = value.to_string(),
            "defaults.profile" => self.defaults.profile = Some(value.to_string()),
            "identity.echo_url" => self.identity.echo_url = value.to_string(),
            "ssh.program" => self.ssh.program = value.to_string(),
            _ => unreachable!("validate_config_key accepted {key}"),
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let hint = match key {
        "defaults.region" if !REGION_PATTERN.is_match(value) => {
            Some("Expected an AWS region such as us-west-1 or eu-central-1.")
        }
        "identity.echo_url"
            if !(value.starts_with("https://") || value.starts_with("http://")) =>
        {
            Some("Expected an http:// or https:// URL.")
        }
        "defaults.user" | "defaults.profile" | "ssh.program"
            if value.trim().is_empty() || value.chars().any(char::is_whitespace) =>
        {
            Some("Value must be non-empty and contain no whitespace.")
        }
        _ => None,
    };
    if let Some(hint) = hint {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            hint: hint.to_string(),
        }
        .into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
