//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;

use thiserror::Error;

// ── Exit codes ────────────────────────────────────────────────────────────────

/// Process exit codes reported by `ingress-ssh connect`.
pub mod exit_code {
    /// Session succeeded and the ingress rule was revoked.
    pub const SUCCESS: u8 = 0;
    /// Usage or configuration error outside the access broker.
    pub const USAGE: u8 = 1;
    /// Caller address, instance metadata, or key file could not be resolved.
    pub const RESOLUTION: u8 = 10;
    /// The ingress rule could not be authorized. No rule was left behind.
    pub const AUTHORIZE: u8 = 11;
    /// The SSH session failed; the ingress rule was revoked.
    pub const SESSION: u8 = 12;
    /// The session succeeded but the ingress rule could not be revoked.
    pub const REVOKE: u8 = 13;
    /// The session failed and the ingress rule could not be revoked.
    pub const SESSION_AND_REVOKE: u8 = 14;
    /// Interrupted by a termination signal.
    pub const INTERRUPTED: u8 = 130;
}

// ── Resolution errors ─────────────────────────────────────────────────────────

/// The caller's address or the target's metadata could not be determined.
///
/// Always raised before any ingress rule exists.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Cannot determine caller public address: {0}")]
    EchoUnavailable(String),

    #[error("Caller public address lookup returned {raw:?}, expected a dotted-quad IPv4 address.")]
    MalformedAddress { raw: String },

    #[error("Instance {instance_id} not found.")]
    InstanceNotFound { instance_id: String },

    #[error("Instance {instance_id} has no {field}.")]
    MissingField {
        instance_id: String,
        field: &'static str,
    },

    #[error("Cannot describe instance {instance_id}: {reason}")]
    Lookup { instance_id: String, reason: String },

    #[error("SSH key file for key pair '{key_name}' not found (tried {}).", tried.join(", "))]
    KeyFileNotFound {
        key_name: String,
        tried: Vec<String>,
    },

    #[error("Identity file {path} does not exist.")]
    IdentityFileMissing { path: String },
}

// ── Rule errors ───────────────────────────────────────────────────────────────

/// Which side of the grant a [`RuleError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOperation {
    Authorize,
    Revoke,
}

impl fmt::Display for RuleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorize => f.write_str("authorize"),
            Self::Revoke => f.write_str("revoke"),
        }
    }
}

/// An authorize or revoke call failed for a reason other than the tolerated
/// duplicate / already-absent conditions.
#[derive(Debug, Error)]
#[error("Cannot {operation} {rule} on {group_id}: {message}")]
pub struct RuleError {
    pub operation: RuleOperation,
    pub group_id: String,
    /// Human-readable rendering of the rule, e.g. `tcp/22 from 198.51.100.5/32`.
    pub rule: String,
    /// Backend error code, when the backend supplied one.
    pub code: Option<String>,
    pub message: String,
}

/// A failure reported by the security-group backend itself.
///
/// Adapters return this inside `anyhow::Error` so the rule client can recover
/// the backend code with `downcast_ref`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

// ── Command errors ────────────────────────────────────────────────────────────

/// The supervised SSH session did not finish cleanly.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{program} exited with code {code}")]
    Exited { program: String, code: i32 },

    #[error("{program} was terminated by a signal")]
    Killed { program: String },

    #[error("Cannot launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Session interrupted by {signal}")]
    Interrupted { signal: &'static str },
}

// ── Broker errors ─────────────────────────────────────────────────────────────

/// Final outcome of a failed brokered session.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Interrupted by {signal} before access was granted.")]
    Interrupted { signal: &'static str },

    #[error(transparent)]
    Authorize(RuleError),

    #[error(transparent)]
    Session(CommandError),

    /// The grant could not be revoked. The rule may still be open.
    #[error("{}", revoke_failed_message(session.as_ref(), revoke))]
    RevokeFailed {
        session: Option<CommandError>,
        revoke: RuleError,
    },
}

fn revoke_failed_message(session: Option<&CommandError>, revoke: &RuleError) -> String {
    let mut msg = format!(
        "Ingress rule {} on {} may still be open: {revoke}",
        revoke.rule, revoke.group_id
    );
    if let Some(session) = session {
        msg.push_str(&format!("\nThe session also failed: {session}"));
    }
    msg
}

impl BrokerError {
    /// Stable process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Resolution(_) => exit_code::RESOLUTION,
            Self::Interrupted { .. } | Self::Session(CommandError::Interrupted { .. }) => {
                exit_code::INTERRUPTED
            }
            Self::Authorize(_) => exit_code::AUTHORIZE,
            Self::Session(_) => exit_code::SESSION,
            Self::RevokeFailed { session: None, .. } => exit_code::REVOKE,
            Self::RevokeFailed {
                session: Some(_), ..
            } => exit_code::SESSION_AND_REVOKE,
        }
    }

    /// Returns `true` when an ingress rule may have been left open.
    #[must_use]
    pub fn grant_left_open(&self) -> bool {
        matches!(self, Self::RevokeFailed { .. })
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{hint}")]
    InvalidValue {
        key: String,
        value: String,
        hint: String,
    },
}
