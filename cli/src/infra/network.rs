//! Network infrastructure — implements `IpEchoSource` using `spawn_blocking`.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::IpEchoSource;

/// Overall timeout for the echo request.
pub const ECHO_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the caller's public address from a plain-text IP-echo endpoint.
pub struct HttpIpEcho {
    url: String,
    timeout: Duration,
}

impl HttpIpEcho {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: ECHO_TIMEOUT,
        }
    }
}

impl IpEchoSource for HttpIpEcho {
    async fn fetch_public_address(&self) -> Result<String> {
        let url = self.url.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            match agent
                .get(&url)
                .set("User-Agent", concat!("ingress-ssh/", env!("CARGO_PKG_VERSION")))
                .call()
            {
                Ok(resp) => resp
                    .into_string()
                    .with_context(|| format!("reading response from {url}")),
                Err(ureq::Error::Status(code, _)) => anyhow::bail!("{url} returned HTTP {code}"),
                Err(e) => Err(anyhow::Error::new(e).context(format!("requesting {url}"))),
            }
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))?
    }
}
