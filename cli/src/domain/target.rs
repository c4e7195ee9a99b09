//! Target instance metadata and the endpoint the session connects to.

use std::path::PathBuf;

use crate::domain::error::ResolutionError;

/// The fields of an instance description the broker needs.
///
/// Fields are optional because the backend may omit any of them (a stopped
/// instance has no public address, an instance launched without a key pair
/// has no key name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub security_group_ids: Vec<String>,
    pub public_address: Option<String>,
    pub key_name: Option<String>,
}

impl InstanceDescription {
    /// The first attached security group.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::MissingField`] when no non-empty group id exists.
    pub fn security_group_id(&self) -> Result<&str, ResolutionError> {
        self.security_group_ids
            .first()
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| self.missing("security group"))
    }

    /// # Errors
    ///
    /// Returns [`ResolutionError::MissingField`] when the instance has no public address.
    pub fn public_address(&self) -> Result<&str, ResolutionError> {
        non_empty(self.public_address.as_deref()).ok_or_else(|| self.missing("public IP address"))
    }

    /// # Errors
    ///
    /// Returns [`ResolutionError::MissingField`] when the instance has no key pair.
    pub fn key_name(&self) -> Result<&str, ResolutionError> {
        non_empty(self.key_name.as_deref()).ok_or_else(|| self.missing("key pair"))
    }

    fn missing(&self, field: &'static str) -> ResolutionError {
        ResolutionError::MissingField {
            instance_id: self.instance_id.clone(),
            field,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fully resolved connection target. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEndpoint {
    pub security_group_id: String,
    pub public_address: String,
    pub identity_file: PathBuf,
    pub user: String,
}

impl TargetEndpoint {
    /// `user@address` as passed to the SSH client.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.public_address)
    }
}
