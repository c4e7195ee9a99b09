//! AWS infrastructure — implements `InstanceDirectory` and `SecurityGroupApi`
//! by driving the `aws` CLI through a `CommandRunner`.
//!
//! Backend failures are parsed from the CLI's stderr
//! (`An error occurred (<Code>) when calling ...`) into `BackendError` so the
//! rule client can classify them.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::application::ports::{
    CommandRunner, InstanceDirectory, RevokeOutcome, SecurityGroupApi,
};
use crate::domain::{BackendError, IngressRuleSpec, InstanceDescription};

/// The AWS command-line client.
pub const AWS_PROGRAM: &str = "aws";

static ERROR_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"An error occurred \(([^)\s]+)\)")
        .unwrap_or_else(|e| unreachable!("ERROR_CODE is a valid pattern: {e}"))
});

const INSTANCE_NOT_FOUND_CODES: &[&str] =
    &["InvalidInstanceID.NotFound", "InvalidInstanceID.Malformed"];

// ── Connection settings ──────────────────────────────────────────────────────

/// How the `aws` CLI authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwsCredentials {
    /// Whatever the CLI's default provider chain finds.
    Ambient,
    /// A named profile from the shared config files.
    Profile(String),
    /// Explicit long-lived or temporary keys.
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

/// Region and credentials applied to every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConnection {
    pub region: String,
    pub credentials: AwsCredentials,
}

// ── Adapter ──────────────────────────────────────────────────────────────────

/// `aws ec2` adapter.
pub struct AwsCli<R> {
    runner: R,
    connection: AwsConnection,
}

impl<R: CommandRunner> AwsCli<R> {
    #[must_use]
    pub fn new(runner: R, connection: AwsConnection) -> Self {
        Self { runner, connection }
    }

    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `aws ec2 <operation> <args...>` and return stdout.
    async fn ec2(&self, operation: &str, args: &[&str]) -> Result<Vec<u8>> {
        let mut full: Vec<&str> = vec!["ec2", operation];
        full.extend_from_slice(args);
        full.extend_from_slice(&[
            "--region",
            self.connection.region.as_str(),
            "--output",
            "json",
        ]);
        if let AwsCredentials::Profile(profile) = &self.connection.credentials {
            full.extend_from_slice(&["--profile", profile.as_str()]);
        }

        let mut env: Vec<(&str, &str)> = Vec::new();
        if let AwsCredentials::Static {
            access_key_id,
            secret_access_key,
            session_token,
        } = &self.connection.credentials
        {
            env.push(("AWS_ACCESS_KEY_ID", access_key_id.as_str()));
            env.push(("AWS_SECRET_ACCESS_KEY", secret_access_key.as_str()));
            if let Some(token) = session_token {
                env.push(("AWS_SESSION_TOKEN", token.as_str()));
            }
        }

        tracing::debug!(operation, region = %self.connection.region, "calling aws ec2");
        let output = self
            .runner
            .run_with_env(AWS_PROGRAM, &full, &env)
            .await
            .with_context(|| format!("running aws ec2 {operation}"))?;

        if !output.status.success() {
            return Err(parse_backend_error(&output.stderr).into());
        }
        Ok(output.stdout)
    }
}

impl<R: CommandRunner> InstanceDirectory for AwsCli<R> {
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceDescription>> {
        match self
            .ec2("describe-instances", &["--instance-ids", instance_id])
            .await
        {
            Ok(stdout) => parse_describe_instances(instance_id, &stdout),
            Err(err)
                if err
                    .downcast_ref::<BackendError>()
                    .and_then(|b| b.code.as_deref())
                    .is_some_and(|code| INSTANCE_NOT_FOUND_CODES.contains(&code)) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl<R: CommandRunner> SecurityGroupApi for AwsCli<R> {
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRuleSpec) -> Result<()> {
        let permissions = ip_permissions_json(rule);
        self.ec2(
            "authorize-security-group-ingress",
            &["--group-id", group_id, "--ip-permissions", permissions.as_str()],
        )
        .await?;
        Ok(())
    }

    async fn revoke_ingress(
        &self,
        group_id: &str,
        rule: &IngressRuleSpec,
    ) -> Result<RevokeOutcome> {
        let permissions = ip_permissions_json(rule);
        let stdout = self
            .ec2(
                "revoke-security-group-ingress",
                &["--group-id", group_id, "--ip-permissions", permissions.as_str()],
            )
            .await?;
        parse_revoke_response(&stdout)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

/// `--ip-permissions` payload naming exactly one rule.
#[must_use]
pub fn ip_permissions_json(rule: &IngressRuleSpec) -> String {
    serde_json::json!([{
        "IpProtocol": rule.protocol(),
        "FromPort": rule.port(),
        "ToPort": rule.port(),
        "IpRanges": [{ "CidrIp": rule.source().as_str() }],
    }])
    .to_string()
}

/// Extract the backend error code from the CLI's stderr.
#[must_use]
pub fn parse_backend_error(stderr: &[u8]) -> BackendError {
    let text = String::from_utf8_lossy(stderr);
    let code = ERROR_CODE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let message = text.trim();
    BackendError {
        code,
        message: if message.is_empty() {
            "aws exited with an error and no output".to_string()
        } else {
            message.to_string()
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    public_ip_address: Option<String>,
    key_name: Option<String>,
    #[serde(default)]
    security_groups: Vec<GroupIdentifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupIdentifier {
    group_id: Option<String>,
}

/// Parse `describe-instances` output; the first instance of the first
/// reservation is used.
///
/// # Errors
///
/// Returns an error if the output is not valid JSON of the expected shape.
pub fn parse_describe_instances(
    instance_id: &str,
    stdout: &[u8],
) -> Result<Option<InstanceDescription>> {
    let response: DescribeInstancesResponse =
        serde_json::from_slice(stdout).context("parsing describe-instances output")?;
    let Some(instance) = response
        .reservations
        .into_iter()
        .next()
        .and_then(|r| r.instances.into_iter().next())
    else {
        return Ok(None);
    };
    Ok(Some(InstanceDescription {
        instance_id: instance_id.to_string(),
        security_group_ids: instance
            .security_groups
            .into_iter()
            .filter_map(|g| g.group_id)
            .collect(),
        public_address: instance.public_ip_address,
        key_name: instance.key_name,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RevokeResponse {
    r#return: Option<bool>,
    #[serde(default)]
    unknown_ip_permissions: Vec<serde_json::Value>,
}

/// Interpret `revoke-security-group-ingress` output.
///
/// The API accepts a revoke for a rule that does not exist and lists it
/// under `UnknownIpPermissions`; that is reported as
/// [`RevokeOutcome::NotPresent`]. Empty output is a plain success.
///
/// # Errors
///
/// Returns an error if the output is not valid JSON or reports `Return: false`.
pub fn parse_revoke_response(stdout: &[u8]) -> Result<RevokeOutcome> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(RevokeOutcome::Revoked);
    }
    let response: RevokeResponse =
        serde_json::from_slice(stdout).context("parsing revoke-security-group-ingress output")?;
    if !response.unknown_ip_permissions.is_empty() {
        return Ok(RevokeOutcome::NotPresent);
    }
    if response.r#return == Some(false) {
        return Err(BackendError {
            code: None,
            message: "revoke-security-group-ingress returned false".to_string(),
        }
        .into());
    }
    Ok(RevokeOutcome::Revoked)
}
