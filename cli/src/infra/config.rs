//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::IngressConfig;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "INGRESS_SSH_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
///
/// The default store resolves its location on every access:
/// `$INGRESS_SSH_CONFIG` if set, else `~/.ingress-ssh/config.yaml`.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    fixed: Option<PathBuf>,
}

impl YamlConfigStore {
    /// A store bound to an explicit file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            fixed: Some(path.into()),
        }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<IngressConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(IngressConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn save(&self, config: &IngressConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.fixed {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".ingress-ssh").join("config.yaml"))
    }
}
