//! Application service — single-rule ingress authorization with guaranteed revoke.
//!
//! [`IngressRuleClient`] is the only place backend error codes are
//! interpreted. [`IngressRuleClient::with_grant`] brackets a future with an
//! authorize / revoke pair: once authorize succeeds, revoke runs when the
//! future completes, including when it panics.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt as _;

use crate::application::ports::{RevokeOutcome, SecurityGroupApi};
use crate::domain::{BackendError, IngressRuleSpec, RuleCondition, RuleError, RuleOperation};

/// Result of a future run under a grant, together with the revoke result.
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    pub revoke: Result<(), RuleError>,
}

/// Authorizes and revokes one ingress rule, tolerating duplicate and
/// already-absent conditions.
pub struct IngressRuleClient<'a, A> {
    api: &'a A,
}

impl<'a, A: SecurityGroupApi> IngressRuleClient<'a, A> {
    #[must_use]
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Add `spec` to `group_id`. An identical existing rule counts as success.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] for any backend failure other than a duplicate.
    pub async fn authorize(&self, group_id: &str, spec: &IngressRuleSpec) -> Result<(), RuleError> {
        match self.api.authorize_ingress(group_id, spec).await {
            Ok(()) => {
                tracing::info!(group_id, rule = %spec, "ingress authorized");
                Ok(())
            }
            Err(err) if condition(&err) == Some(RuleCondition::AlreadyExists) => {
                tracing::info!(group_id, rule = %spec, "ingress rule already present");
                Ok(())
            }
            Err(err) => Err(rule_error(RuleOperation::Authorize, group_id, spec, &err)),
        }
    }

    /// Remove `spec` from `group_id`. A rule that is already gone counts as success.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] for any backend failure other than not-found.
    pub async fn revoke(&self, group_id: &str, spec: &IngressRuleSpec) -> Result<(), RuleError> {
        match self.api.revoke_ingress(group_id, spec).await {
            Ok(RevokeOutcome::Revoked) => {
                tracing::info!(group_id, rule = %spec, "ingress revoked");
                Ok(())
            }
            Ok(RevokeOutcome::NotPresent) => {
                tracing::info!(group_id, rule = %spec, "ingress rule already absent");
                Ok(())
            }
            Err(err) if condition(&err) == Some(RuleCondition::AlreadyAbsent) => {
                tracing::info!(group_id, rule = %spec, "ingress rule already absent");
                Ok(())
            }
            Err(err) => Err(rule_error(RuleOperation::Revoke, group_id, spec, &err)),
        }
    }

    /// Authorize `spec`, then drive `body` to completion, then revoke `spec`.
    ///
    /// `body` is not polled unless authorize succeeds. Once it has been
    /// authorized the rule is revoked exactly once, whether `body` returns or
    /// panics; a panic is resumed after the revoke.
    ///
    /// # Errors
    ///
    /// Returns the authorize [`RuleError`] if the grant could not be made. A
    /// revoke failure is reported in [`Scoped::revoke`], never here.
    pub async fn with_grant<F, T>(
        &self,
        group_id: &str,
        spec: &IngressRuleSpec,
        body: F,
    ) -> Result<Scoped<T>, RuleError>
    where
        F: Future<Output = T>,
    {
        self.authorize(group_id, spec).await?;
        let mut grant = OpenGrant {
            group_id,
            spec,
            armed: true,
        };

        let value = AssertUnwindSafe(body).catch_unwind().await;
        let revoke = self.revoke(group_id, spec).await;
        grant.armed = false;

        if let Err(err) = &revoke {
            warn_left_open(group_id, spec, err);
        }
        match value {
            Ok(value) => Ok(Scoped { value, revoke }),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Armed while a grant exists but its revoke has not returned yet. Dropping
/// it armed means the surrounding future was cancelled with the rule open.
struct OpenGrant<'s> {
    group_id: &'s str,
    spec: &'s IngressRuleSpec,
    armed: bool,
}

impl Drop for OpenGrant<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::error!(
            group_id = self.group_id,
            rule = %self.spec,
            "ingress grant abandoned before revoke; remove it with: {}",
            manual_revoke_command(self.group_id, self.spec)
        );
    }
}

/// Emit the operator-facing warning for a rule that could not be revoked.
fn warn_left_open(group_id: &str, spec: &IngressRuleSpec, err: &RuleError) {
    tracing::warn!(
        group_id,
        rule = %spec,
        error = %err,
        "ingress rule may still be open; remove it with: {}",
        manual_revoke_command(group_id, spec)
    );
}

/// The `aws` command an operator can run to remove the rule by hand.
#[must_use]
pub fn manual_revoke_command(group_id: &str, spec: &IngressRuleSpec) -> String {
    format!(
        "aws ec2 revoke-security-group-ingress --group-id {group_id} --protocol {} --port {} --cidr {}",
        spec.protocol(),
        spec.port(),
        spec.source()
    )
}

fn condition(err: &anyhow::Error) -> Option<RuleCondition> {
    let code = err.downcast_ref::<BackendError>()?.code.as_deref()?;
    Some(RuleCondition::classify(code))
}

fn rule_error(
    operation: RuleOperation,
    group_id: &str,
    spec: &IngressRuleSpec,
    err: &anyhow::Error,
) -> RuleError {
    RuleError {
        operation,
        group_id: group_id.to_string(),
        rule: spec.to_string(),
        code: err
            .downcast_ref::<BackendError>()
            .and_then(|backend| backend.code.clone()),
        message: format!("{err:#}"),
    }
}
