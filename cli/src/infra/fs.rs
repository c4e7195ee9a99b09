//! Filesystem infrastructure — implements `IdentityFiles` over `~/.ssh`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::ports::IdentityFiles;
use crate::domain::ResolutionError;

/// Looks up key-pair private keys in a per-user SSH directory.
pub struct SshKeyDir {
    dir: PathBuf,
}

impl SshKeyDir {
    /// Uses `~/.ssh`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_dir(home.join(".ssh")))
    }

    /// Uses an arbitrary directory (for testing).
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Candidate paths for `key_name`, in lookup order.
    #[must_use]
    pub fn candidates(&self, key_name: &str) -> [PathBuf; 2] {
        [
            self.dir.join(key_name),
            self.dir.join(format!("{key_name}.pem")),
        ]
    }
}

impl IdentityFiles for SshKeyDir {
    fn locate_for_key_pair(&self, key_name: &str) -> Result<PathBuf, ResolutionError> {
        let candidates = self.candidates(key_name);
        if let Some(found) = candidates.iter().find(|path| path.is_file()) {
            return Ok(found.clone());
        }
        Err(ResolutionError::KeyFileNotFound {
            key_name: key_name.to_string(),
            tried: candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}
