//! `ingress-ssh config` — show and set configuration values.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::config_service;
use crate::domain::IngressConfig;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (defaults.user, defaults.region, defaults.profile,
        /// identity.echo_url, ssh.program)
        key: String,
        /// Configuration value
        value: String,
    },
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the key or value is invalid or the file cannot be
/// read or written.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
        ConfigCommand::Set { key, value } => set_config(app, &key, &value),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let path = app.config_store.path()?;
    render_config(app, &config, &path.display().to_string());
    Ok(ExitCode::SUCCESS)
}

fn render_config(app: &AppContext, config: &IngressConfig, path: &str) {
    let out = &app.output;
    out.header(&format!("Configuration ({path})"));
    out.kv("defaults.user", &config.defaults.user);
    out.kv("defaults.region", &config.defaults.region);
    out.kv(
        "defaults.profile",
        config.defaults.profile.as_deref().unwrap_or("(ambient credentials)"),
    );
    out.kv("identity.echo_url", &config.identity.echo_url);
    out.kv("ssh.program", &config.ssh.program);
    if !config.ssh.extra_args.is_empty() {
        out.kv("ssh.extra_args", &config.ssh.extra_args.join(" "));
    }
}

fn set_config(app: &AppContext, key: &str, value: &str) -> Result<ExitCode> {
    config_service::set_config_value(&app.config_store, key, value)?;
    tracing::info!(key, value, "configuration updated");
    app.output.success(&format!("Set {key} = {value}"));
    Ok(ExitCode::SUCCESS)
}
