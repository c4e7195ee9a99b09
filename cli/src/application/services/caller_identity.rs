//! Application service — caller identity resolution.

use crate::application::ports::IpEchoSource;
use crate::domain::{CallerCidr, ResolutionError};

/// Resolve the caller's public address as a `/32` CIDR.
///
/// Issues exactly one request; there are no retries.
///
/// # Errors
///
/// Returns [`ResolutionError::EchoUnavailable`] if the request fails and
/// [`ResolutionError::MalformedAddress`] if the response is not a bare
/// dotted-quad address.
pub async fn resolve_public_cidr(echo: &impl IpEchoSource) -> Result<CallerCidr, ResolutionError> {
    let raw = echo
        .fetch_public_address()
        .await
        .map_err(|e| ResolutionError::EchoUnavailable(format!("{e:#}")))?;
    let cidr = CallerCidr::from_echo_response(&raw)?;
    tracing::debug!(%cidr, "resolved caller address");
    Ok(cidr)
}
