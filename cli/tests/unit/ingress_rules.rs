//! Tests for the ingress rule client and its scoped grant.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use futures_util::FutureExt as _;
use ingress_ssh::application::ports::{RevokeOutcome, SecurityGroupApi};
use ingress_ssh::application::services::ingress_rules::{
    IngressRuleClient, Scoped, manual_revoke_command,
};
use ingress_ssh::domain::{CallerCidr, IngressRuleSpec, RuleOperation};

use crate::helpers::{CALLER, GROUP, GroupsMock, Journal, backend_error};

fn spec() -> IngressRuleSpec {
    IngressRuleSpec::ssh(CallerCidr::from_echo_response(CALLER).expect("valid"))
}

/// A security group that behaves like the real backend: rules are a set,
/// adding an existing rule or removing a missing one fails with its code.
#[derive(Default)]
struct RuleSet {
    rules: Mutex<HashSet<(String, String)>>,
}

impl SecurityGroupApi for RuleSet {
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRuleSpec) -> Result<()> {
        if self
            .rules
            .lock()
            .unwrap()
            .insert((group_id.to_string(), rule.to_string()))
        {
            Ok(())
        } else {
            Err(backend_error((Some("InvalidPermission.Duplicate"), "already exists")))
        }
    }

    async fn revoke_ingress(
        &self,
        group_id: &str,
        rule: &IngressRuleSpec,
    ) -> Result<RevokeOutcome> {
        if self
            .rules
            .lock()
            .unwrap()
            .remove(&(group_id.to_string(), rule.to_string()))
        {
            Ok(RevokeOutcome::Revoked)
        } else {
            Err(backend_error((Some("InvalidPermission.NotFound"), "no such rule")))
        }
    }
}

#[tokio::test]
async fn test_authorize_twice_succeeds_both_times() {
    let groups = RuleSet::default();
    let client = IngressRuleClient::new(&groups);
    client.authorize(GROUP, &spec()).await.expect("first");
    client.authorize(GROUP, &spec()).await.expect("second");
    assert_eq!(groups.rules.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_never_authorized_and_twice_succeeds() {
    let groups = RuleSet::default();
    let client = IngressRuleClient::new(&groups);
    client.revoke(GROUP, &spec()).await.expect("never granted");
    client.authorize(GROUP, &spec()).await.expect("granted");
    client.revoke(GROUP, &spec()).await.expect("first revoke");
    client.revoke(GROUP, &spec()).await.expect("second revoke");
    assert!(groups.rules.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_authorize_passes_spec_through() {
    let groups = GroupsMock::ok(&Journal::default());
    IngressRuleClient::new(&groups)
        .authorize(GROUP, &spec())
        .await
        .expect("authorized");
    assert_eq!(groups.authorized(), vec![(GROUP.to_string(), spec())]);
}

#[tokio::test]
async fn test_authorize_duplicate_is_success() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.authorize_failure = Some((Some("InvalidPermission.Duplicate"), "already exists"));
    assert!(
        IngressRuleClient::new(&groups)
            .authorize(GROUP, &spec())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_authorize_other_code_is_rule_error() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.authorize_failure = Some((Some("InvalidGroup.NotFound"), "no such group"));
    let err = IngressRuleClient::new(&groups)
        .authorize(GROUP, &spec())
        .await
        .unwrap_err();
    assert_eq!(err.operation, RuleOperation::Authorize);
    assert_eq!(err.code.as_deref(), Some("InvalidGroup.NotFound"));
    assert_eq!(err.rule, "tcp/22 from 198.51.100.5/32");
    assert!(err.message.contains("no such group"));
}

#[tokio::test]
async fn test_authorize_uncoded_failure_is_rule_error() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.authorize_failure = Some((None, "Could not connect to the endpoint URL"));
    let err = IngressRuleClient::new(&groups)
        .authorize(GROUP, &spec())
        .await
        .unwrap_err();
    assert_eq!(err.code, None);
}

#[tokio::test]
async fn test_revoke_not_present_outcome_is_success() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.revoke_outcome = RevokeOutcome::NotPresent;
    assert!(
        IngressRuleClient::new(&groups)
            .revoke(GROUP, &spec())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_revoke_not_found_code_is_success() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.revoke_failure = Some((Some("InvalidPermission.NotFound"), "gone"));
    assert!(
        IngressRuleClient::new(&groups)
            .revoke(GROUP, &spec())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_revoke_duplicate_code_is_not_tolerated() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.revoke_failure = Some((Some("InvalidPermission.Duplicate"), "odd"));
    let err = IngressRuleClient::new(&groups)
        .revoke(GROUP, &spec())
        .await
        .unwrap_err();
    assert_eq!(err.operation, RuleOperation::Revoke);
}

#[tokio::test]
async fn test_with_grant_runs_body_between_authorize_and_revoke() {
    let journal = Journal::default();
    let groups = GroupsMock::ok(&journal);
    let body_journal = journal.clone();
    let Scoped { value, revoke } = IngressRuleClient::new(&groups)
        .with_grant(GROUP, &spec(), async move {
            body_journal.push("body");
            42
        })
        .await
        .expect("granted");

    assert_eq!(value, 42);
    assert!(revoke.is_ok());
    let entries = journal.entries();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].starts_with("authorize"));
    assert_eq!(entries[1], "body");
    assert!(entries[2].starts_with("revoke"));
}

#[tokio::test]
async fn test_with_grant_skips_body_when_authorize_fails() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.authorize_failure = Some((Some("UnauthorizedOperation"), "denied"));
    let polled = AtomicBool::new(false);
    let result = IngressRuleClient::new(&groups)
        .with_grant(GROUP, &spec(), async {
            polled.store(true, Ordering::SeqCst);
        })
        .await;

    assert!(result.is_err());
    assert!(!polled.load(Ordering::SeqCst));
    assert!(groups.revoked().is_empty());
}

#[tokio::test]
async fn test_with_grant_reports_revoke_failure_alongside_value() {
    let mut groups = GroupsMock::ok(&Journal::default());
    groups.revoke_failure = Some((Some("RequestLimitExceeded"), "slow down"));
    let scoped = IngressRuleClient::new(&groups)
        .with_grant(GROUP, &spec(), async { "done" })
        .await
        .expect("granted");

    assert_eq!(scoped.value, "done");
    let err = scoped.revoke.unwrap_err();
    assert_eq!(err.code.as_deref(), Some("RequestLimitExceeded"));
}

#[tokio::test]
async fn test_with_grant_revokes_then_resumes_panic() {
    let groups = GroupsMock::ok(&Journal::default());
    let client = IngressRuleClient::new(&groups);
    let spec = spec();
    let outcome = AssertUnwindSafe(client.with_grant(GROUP, &spec, async {
        panic!("body failed");
    }))
    .catch_unwind()
    .await;

    let payload = outcome.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"body failed"));
    assert_eq!(groups.revoked(), vec![(GROUP.to_string(), spec)]);
}

#[test]
fn test_manual_revoke_command() {
    assert_eq!(
        manual_revoke_command(GROUP, &spec()),
        "aws ec2 revoke-security-group-ingress --group-id sg-1 --protocol tcp --port 22 --cidr 198.51.100.5/32"
    );
}
