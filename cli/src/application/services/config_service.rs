//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::IngressConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<IngressConfig> {
    store.load()
}

/// Validate and persist a single `key = value` setting, returning the updated config.
///
/// Nothing is written when the key or value is rejected.
///
/// # Errors
///
/// Returns an error if validation fails or the configuration cannot be saved.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<IngressConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}
