//! Application service — supervise the interactive SSH client.

use std::path::Path;

use crate::application::ports::CommandRunner;
use crate::domain::CommandError;

/// Launches the SSH client with inherited stdio and waits for it to exit.
pub struct SessionRunner<'a, R> {
    runner: &'a R,
    program: String,
    extra_args: Vec<String>,
}

impl<'a, R: CommandRunner> SessionRunner<'a, R> {
    /// `extra_args` are inserted between the identity option and the destination.
    #[must_use]
    pub fn new(runner: &'a R, program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            extra_args,
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the SSH client: `-i <identity> [extra...] user@address`.
    #[must_use]
    pub fn arguments(&self, identity_file: &Path, user: &str, address: &str) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            identity_file.to_string_lossy().into_owned(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(format!("{user}@{address}"));
        args
    }

    /// Run one session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Launch`] if the client cannot be started,
    /// [`CommandError::Exited`] on a non-zero exit and
    /// [`CommandError::Killed`] if the client died from a signal.
    pub async fn run(
        &self,
        identity_file: &Path,
        user: &str,
        address: &str,
    ) -> Result<(), CommandError> {
        let args = self.arguments(identity_file, user, address);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::info!(program = %self.program, args = ?arg_refs, "starting session");

        let status = self
            .runner
            .run_status(&self.program, &arg_refs)
            .await
            .map_err(|e| CommandError::Launch {
                program: self.program.clone(),
                reason: format!("{e:#}"),
            })?;

        if status.success() {
            tracing::info!(program = %self.program, "session ended");
            return Ok(());
        }
        tracing::info!(program = %self.program, code = ?status.code(), "session failed");
        match status.code() {
            Some(code) => Err(CommandError::Exited {
                program: self.program.clone(),
                code,
            }),
            None => Err(CommandError::Killed {
                program: self.program.clone(),
            }),
        }
    }
}
