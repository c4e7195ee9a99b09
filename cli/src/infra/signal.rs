//! Signal infrastructure — implements `TerminationSignal` with `tokio::signal`.

use anyhow::{Context, Result};

use crate::application::ports::TerminationSignal;

/// Listens for SIGINT, SIGTERM and SIGHUP (Ctrl-C on non-unix platforms).
///
/// Handlers are installed in [`OsTerminationSignal::install`], so a signal
/// delivered at any point afterwards is held until the next `recv`.
#[cfg(unix)]
pub struct OsTerminationSignal {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsTerminationSignal {
    /// Install the handlers. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler cannot be registered.
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("installing SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("installing SIGTERM handler")?,
            hangup: signal(SignalKind::hangup()).context("installing SIGHUP handler")?,
        })
    }
}

#[cfg(unix)]
impl TerminationSignal for OsTerminationSignal {
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }
}

#[cfg(not(unix))]
pub struct OsTerminationSignal {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl OsTerminationSignal {
    /// Install the handler. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be registered.
    pub fn install() -> Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c().context("installing Ctrl-C handler")?,
        })
    }
}

#[cfg(not(unix))]
impl TerminationSignal for OsTerminationSignal {
    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl-C"
    }
}
