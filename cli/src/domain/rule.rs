//! Ingress rule values and backend error classification.

use std::fmt;

use crate::domain::cidr::CallerCidr;

/// Protocol opened for the session.
pub const SSH_PROTOCOL: &str = "tcp";

/// Port opened for the session.
pub const SSH_PORT: u16 = 22;

/// One (protocol, port, source CIDR) ingress rule.
///
/// Authorize and revoke must be issued with equal specs so the revoke matches
/// exactly what was granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRuleSpec {
    protocol: &'static str,
    port: u16,
    source: CallerCidr,
}

impl IngressRuleSpec {
    /// The SSH rule for `source`: `tcp`, port 22.
    #[must_use]
    pub fn ssh(source: CallerCidr) -> Self {
        Self {
            protocol: SSH_PROTOCOL,
            port: SSH_PORT,
            source,
        }
    }

    #[must_use]
    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn source(&self) -> &CallerCidr {
        &self.source
    }
}

impl fmt::Display for IngressRuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} from {}", self.protocol, self.port, self.source)
    }
}

// ── Backend conditions ───────────────────────────────────────────────────────

/// Error code returned when authorizing a rule that is already present.
pub const CODE_DUPLICATE: &str = "InvalidPermission.Duplicate";

/// Error code returned when revoking a rule that is not present.
pub const CODE_NOT_FOUND: &str = "InvalidPermission.NotFound";

/// Closed set of backend conditions the rule client treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// The exact rule already exists. Authorize treats this as success.
    AlreadyExists,
    /// The exact rule is not present. Revoke treats this as success.
    AlreadyAbsent,
    /// Anything else — a genuine failure.
    Other,
}

impl RuleCondition {
    /// Classify a backend error code.
    #[must_use]
    pub fn classify(code: &str) -> Self {
        match code {
            CODE_DUPLICATE => Self::AlreadyExists,
            CODE_NOT_FOUND => Self::AlreadyAbsent,
            _ => Self::Other,
        }
    }
}
