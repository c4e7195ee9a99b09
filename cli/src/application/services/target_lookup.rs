//! Application service — resolve the connection target for an instance.

use std::path::PathBuf;

use crate::application::ports::{IdentityFiles, InstanceDirectory};
use crate::domain::{ResolutionError, TargetEndpoint};

/// What the caller asked to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub instance_id: String,
    /// Explicit private key; when `None` the instance's key pair is looked up.
    pub identity_file: Option<PathBuf>,
    pub user: String,
}

/// Combines the instance directory and the local key files into a [`TargetEndpoint`].
pub struct TargetLookup<'a, D, F> {
    instances: &'a D,
    identity_files: &'a F,
}

impl<'a, D: InstanceDirectory, F: IdentityFiles> TargetLookup<'a, D, F> {
    #[must_use]
    pub fn new(instances: &'a D, identity_files: &'a F) -> Self {
        Self {
            instances,
            identity_files,
        }
    }

    /// Describe the instance and pick its security group, address and key.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] if the instance is unknown, lacks a
    /// security group, public address or key pair, or the key file is missing.
    pub async fn resolve(&self, request: &ConnectRequest) -> Result<TargetEndpoint, ResolutionError> {
        let instance_id = &request.instance_id;
        let description = self
            .instances
            .describe_instance(instance_id)
            .await
            .map_err(|e| ResolutionError::Lookup {
                instance_id: instance_id.clone(),
                reason: format!("{e:#}"),
            })?
            .ok_or_else(|| ResolutionError::InstanceNotFound {
                instance_id: instance_id.clone(),
            })?;

        let security_group_id = description.security_group_id()?.to_string();
        let public_address = description.public_address()?.to_string();
        let identity_file = match &request.identity_file {
            Some(path) if self.identity_files.exists(path) => path.clone(),
            Some(path) => {
                return Err(ResolutionError::IdentityFileMissing {
                    path: path.display().to_string(),
                });
            }
            None => self
                .identity_files
                .locate_for_key_pair(description.key_name()?)?,
        };

        tracing::debug!(
            instance_id = %instance_id,
            security_group_id = %security_group_id,
            public_address = %public_address,
            identity_file = %identity_file.display(),
            "resolved target"
        );
        Ok(TargetEndpoint {
            security_group_id,
            public_address,
            identity_file,
            user: request.user.clone(),
        })
    }
}
