//! Application service — scoped ingress access broker.
//!
//! Drives one session through
//! `Idle → IpResolved → TargetResolved → Authorized → SessionRunning →
//! {SessionSucceeded | SessionFailed} → Revoked → Done`.
//!
//! Any failure before `Authorized` goes straight to `Done`: nothing was
//! granted, so nothing is revoked. From `Authorized` on, the session runs
//! inside [`IngressRuleClient::with_grant`], which revokes on every exit path.

use std::future::Future;

use crate::application::ports::{
    CommandRunner, IdentityFiles, InstanceDirectory, IpEchoSource, ProgressReporter,
    SecurityGroupApi, TerminationSignal,
};
use crate::application::services::caller_identity::resolve_public_cidr;
use crate::application::services::ingress_rules::{IngressRuleClient, Scoped, manual_revoke_command};
use crate::application::services::session_runner::SessionRunner;
use crate::application::services::target_lookup::{ConnectRequest, TargetLookup};
use crate::domain::{
    BrokerError, CommandError, IngressRuleSpec, ResolutionError, TargetEndpoint,
};

/// Broker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Idle,
    IpResolved,
    TargetResolved,
    Authorized,
    SessionRunning,
    SessionSucceeded,
    SessionFailed,
    Revoked,
    Done,
}

/// One-shot broker: resolve, authorize, run the session, revoke.
pub struct AccessBroker<'a, E, D, F, A, R> {
    echo: &'a E,
    targets: TargetLookup<'a, D, F>,
    rules: IngressRuleClient<'a, A>,
    session: SessionRunner<'a, R>,
    history: Vec<BrokerState>,
}

impl<'a, E, D, F, A, R> AccessBroker<'a, E, D, F, A, R>
where
    E: IpEchoSource,
    D: InstanceDirectory,
    F: IdentityFiles,
    A: SecurityGroupApi,
    R: CommandRunner,
{
    #[must_use]
    pub fn new(
        echo: &'a E,
        targets: TargetLookup<'a, D, F>,
        rules: IngressRuleClient<'a, A>,
        session: SessionRunner<'a, R>,
    ) -> Self {
        Self {
            echo,
            targets,
            rules,
            session,
            history: Vec::new(),
        }
    }

    /// States visited by the last [`connect`](Self::connect), in order.
    #[must_use]
    pub fn history(&self) -> &[BrokerState] {
        &self.history
    }

    /// Run one brokered session.
    ///
    /// Returns the session's own result. A revoke failure never replaces a
    /// session failure: both are carried by [`BrokerError::RevokeFailed`].
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] describing the first failure, plus any
    /// revoke failure that followed it.
    pub async fn connect(
        &mut self,
        request: &ConnectRequest,
        signals: &mut impl TerminationSignal,
        reporter: &impl ProgressReporter,
    ) -> Result<(), BrokerError> {
        self.history.clear();
        record(&mut self.history, BrokerState::Idle);
        let result = self.drive(request, signals, reporter).await;
        record(&mut self.history, BrokerState::Done);
        result
    }

    async fn drive(
        &mut self,
        request: &ConnectRequest,
        signals: &mut impl TerminationSignal,
        reporter: &impl ProgressReporter,
    ) -> Result<(), BrokerError> {
        reporter.step("Resolving caller public address...");
        let cidr = interruptible(signals, resolve_public_cidr(self.echo)).await?;
        record(&mut self.history, BrokerState::IpResolved);
        reporter.success(&format!("Caller address {cidr}"));

        reporter.step(&format!("Looking up instance {}...", request.instance_id));
        let target = interruptible(signals, self.targets.resolve(request)).await?;
        record(&mut self.history, BrokerState::TargetResolved);
        reporter.success(&format!(
            "Target {} via {}",
            target.destination(),
            target.security_group_id
        ));

        let spec = IngressRuleSpec::ssh(cidr);
        let group_id = target.security_group_id.as_str();
        reporter.step(&format!("Authorizing {spec} on {group_id}..."));

        let history = &mut self.history;
        let session = &self.session;
        let target = &target;
        let spec_ref = &spec;
        let guarded = async move {
            record(history, BrokerState::Authorized);
            reporter.success(&format!("Authorized {spec_ref} on {group_id}"));
            record(history, BrokerState::SessionRunning);
            let outcome = supervise(session, target, signals).await;
            record(
                history,
                if outcome.is_ok() {
                    BrokerState::SessionSucceeded
                } else {
                    BrokerState::SessionFailed
                },
            );
            reporter.step(&format!("Revoking {spec_ref} on {group_id}..."));
            outcome
        };

        let Scoped {
            value: session,
            revoke,
        } = self
            .rules
            .with_grant(group_id, &spec, guarded)
            .await
            .map_err(BrokerError::Authorize)?;
        record(&mut self.history, BrokerState::Revoked);

        match (session, revoke) {
            (Ok(()), Ok(())) => {
                reporter.success("Ingress revoked");
                Ok(())
            }
            (Err(session), Ok(())) => {
                reporter.success("Ingress revoked");
                Err(BrokerError::Session(session))
            }
            (session, Err(revoke)) => {
                reporter.warn(&format!(
                    "Ingress rule {spec} on {group_id} could not be revoked. Remove it with:\n    {}",
                    manual_revoke_command(group_id, &spec)
                ));
                Err(BrokerError::RevokeFailed {
                    session: session.err(),
                    revoke,
                })
            }
        }
    }
}

fn record(history: &mut Vec<BrokerState>, state: BrokerState) {
    tracing::debug!(?state, "broker transition");
    history.push(state);
}

/// Run a pre-grant step, abandoning it if a termination request arrives.
async fn interruptible<T>(
    signals: &mut impl TerminationSignal,
    step: impl Future<Output = Result<T, ResolutionError>>,
) -> Result<T, BrokerError> {
    tokio::select! {
        biased;
        signal = signals.recv() => {
            tracing::warn!(signal, "interrupted before access was granted");
            Err(BrokerError::Interrupted { signal })
        }
        result = step => result.map_err(BrokerError::from),
    }
}

/// Run the session, killing it if a termination request arrives.
async fn supervise<R: CommandRunner>(
    session: &SessionRunner<'_, R>,
    target: &TargetEndpoint,
    signals: &mut impl TerminationSignal,
) -> Result<(), CommandError> {
    tokio::select! {
        biased;
        signal = signals.recv() => {
            tracing::warn!(signal, program = session.program(), "terminating session");
            Err(CommandError::Interrupted { signal })
        }
        result = session.run(&target.identity_file, &target.user, &target.public_address) => result,
    }
}
