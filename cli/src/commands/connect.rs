//! `ingress-ssh connect` — open SSH to an instance for one session.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::broker::AccessBroker;
use crate::application::services::config_service;
use crate::application::services::ingress_rules::IngressRuleClient;
use crate::application::services::session_runner::SessionRunner;
use crate::application::services::target_lookup::{ConnectRequest, TargetLookup};
use crate::domain::{IngressConfig, validate_config_value};
use crate::infra::aws::{AwsCli, AwsConnection, AwsCredentials};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::SshKeyDir;
use crate::infra::network::HttpIpEcho;
use crate::infra::signal::OsTerminationSignal;
use crate::output::TerminalReporter;

/// Arguments for the connect command.
#[derive(Args, Debug, Default)]
pub struct ConnectArgs {
    /// EC2 instance ID, e.g. i-0123456789abcdef0
    pub instance_id: String,

    /// Private key file [default: ~/.ssh/<key pair name>, then ~/.ssh/<key pair name>.pem]
    #[arg(short = 'i', long, value_name = "PATH")]
    pub identity_file: Option<PathBuf>,

    /// Remote login user [default: defaults.user from config, ec2-user]
    #[arg(short, long)]
    pub user: Option<String>,

    /// AWS region [default: defaults.region from config, us-west-1]
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Named AWS profile [default: defaults.profile from config]
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Explicit access key ID (takes precedence over --profile)
    #[arg(long, requires = "secret_access_key")]
    pub access_key_id: Option<String>,

    /// Explicit secret access key
    #[arg(long, requires = "access_key_id", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[arg(long, requires = "access_key_id")]
    pub session_token: Option<String>,

    /// IP-echo endpoint used to discover the caller address
    #[arg(long, value_name = "URL")]
    pub echo_url: Option<String>,
}

/// Effective settings after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    pub request: ConnectRequest,
    pub connection: AwsConnection,
    pub echo_url: String,
}

impl ConnectSettings {
    /// Merge command-line flags over configured defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag value fails the same validation as the
    /// corresponding config key.
    pub fn resolve(args: ConnectArgs, config: &IngressConfig) -> Result<Self> {
        let user = args.user.unwrap_or_else(|| config.defaults.user.clone());
        validate_config_value("defaults.user", &user)?;
        let region = args
            .region
            .unwrap_or_else(|| config.defaults.region.clone());
        validate_config_value("defaults.region", &region)?;
        let echo_url = args
            .echo_url
            .unwrap_or_else(|| config.identity.echo_url.clone());
        validate_config_value("identity.echo_url", &echo_url)?;

        let credentials = match (args.access_key_id, args.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => AwsCredentials::Static {
                access_key_id,
                secret_access_key,
                session_token: args.session_token,
            },
            _ => match args.profile.or_else(|| config.defaults.profile.clone()) {
                Some(profile) => AwsCredentials::Profile(profile),
                None => AwsCredentials::Ambient,
            },
        };

        Ok(Self {
            request: ConnectRequest {
                instance_id: args.instance_id,
                identity_file: args.identity_file,
                user,
            },
            connection: AwsConnection {
                region,
                credentials,
            },
            echo_url,
        })
    }
}

/// Run `ingress-ssh connect <instance>`.
///
/// Broker failures are reported and mapped to their exit code here; only
/// setup failures (config, home directory, signal handlers) are returned as
/// errors.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or local setup fails.
pub async fn run(app: &AppContext, args: ConnectArgs) -> Result<ExitCode> {
    let mut signals = OsTerminationSignal::install()?;
    let config = config_service::load_config(&app.config_store)?;
    let ConnectSettings {
        request,
        connection,
        echo_url,
    } = ConnectSettings::resolve(args, &config)?;
    tracing::debug!(?request, region = %connection.region, "connect settings resolved");

    let echo = HttpIpEcho::new(echo_url);
    let aws = AwsCli::new(TokioCommandRunner::default(), connection);
    let keys = SshKeyDir::new()?;
    let session_runner = TokioCommandRunner::default();
    let reporter = TerminalReporter::new(&app.output);

    let mut broker = AccessBroker::new(
        &echo,
        TargetLookup::new(&aws, &keys),
        IngressRuleClient::new(&aws),
        SessionRunner::new(&session_runner, config.ssh.program, config.ssh.extra_args),
    );

    match broker.connect(&request, &mut signals, &reporter).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            if err.grant_left_open() {
                tracing::warn!(error = %err, "session ended with ingress left open");
            }
            app.output.error(&err.to_string());
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}
