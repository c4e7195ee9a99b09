//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use anyhow::Result;

use crate::domain::{IngressConfig, IngressRuleSpec, InstanceDescription, ResolutionError};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_env` with no extra
    /// environment.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with additional environment variables and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout, the child process must be killed (not
    /// left orphaned).
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output>;
    /// Run a program with inherited stdio and return only its exit status.
    ///
    /// No timeout applies. If the returned future is dropped before the
    /// program exits, the program must be killed.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;
}

// ── Caller Identity Port ──────────────────────────────────────────────────────

/// Plain-text IP-echo endpoint.
#[allow(async_fn_in_trait)]
pub trait IpEchoSource {
    /// Fetch the raw response body, unmodified.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not 2xx.
    async fn fetch_public_address(&self) -> Result<String>;
}

// ── Cloud Ports ───────────────────────────────────────────────────────────────

/// What a revoke call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The rule existed and was removed.
    Revoked,
    /// The backend accepted the call but reported the rule as unknown.
    NotPresent,
}

/// Single-rule mutation of a security group's ingress permissions.
///
/// Implementations return backend failures as `domain::BackendError` inside
/// the `anyhow::Error` so callers can inspect the backend code.
#[allow(async_fn_in_trait)]
pub trait SecurityGroupApi {
    /// Add exactly one ingress rule to `group_id`.
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRuleSpec) -> Result<()>;
    /// Remove exactly one ingress rule from `group_id`.
    async fn revoke_ingress(&self, group_id: &str, rule: &IngressRuleSpec)
    -> Result<RevokeOutcome>;
}

/// Instance metadata lookup.
#[allow(async_fn_in_trait)]
pub trait InstanceDirectory {
    /// Describe one instance. Returns `None` if the instance does not exist.
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceDescription>>;
}

// ── Local Filesystem Ports ────────────────────────────────────────────────────

/// Locates SSH private keys for EC2 key pairs.
pub trait IdentityFiles {
    /// Find the private key file for `key_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::KeyFileNotFound`] listing every candidate tried.
    fn locate_for_key_pair(&self, key_name: &str) -> Result<PathBuf, ResolutionError>;
    /// Returns `true` if `path` names an existing file.
    fn exists(&self, path: &Path) -> bool;
}

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    fn load(&self) -> Result<IngressConfig>;
    /// Persist the configuration.
    fn save(&self, config: &IngressConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

// ── Signal Port ───────────────────────────────────────────────────────────────

/// Termination requests delivered to this process.
#[allow(async_fn_in_trait)]
pub trait TerminationSignal {
    /// Wait for the next termination request and return the signal's name.
    ///
    /// Requests received before the call must not be lost.
    async fn recv(&mut self) -> &'static str;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
