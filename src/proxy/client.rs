use crate::{Error, Result, config::RelayConfig, relay::ResolvedTarget};
use axum::http::HeaderValue;
use reqwest::{Client, Response, header::RANGE, redirect};
use std::collections::HashSet;

use super::HeaderProfile;

/// HTTP client for fetching from the provider.
///
/// Issues exactly one GET per call. Blocked statuses are turned into
/// [`Error::UpstreamBlocked`]; nothing is retried.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    profile: HeaderProfile,
    blocked_statuses: HashSet<u16>,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        // No total timeout: live channels stay open indefinitely.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .redirect(redirect_policy(config))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &RelayConfig) -> Self {
        Self {
            client,
            profile: config.header_profile.clone(),
            blocked_statuses: config.blocked_statuses.clone(),
        }
    }

    /// Fetch the target, forwarding the client's range header verbatim.
    ///
    /// The response body is left unread so the caller can stream it.
    pub async fn fetch(
        &self,
        target: &ResolvedTarget,
        range: Option<&HeaderValue>,
    ) -> Result<Response> {
        let mut request = self.profile.apply(self.client.get(target.url().clone()));

        if let Some(range) = range {
            request = request.header(RANGE, range.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = Error::from(e);
                tracing::warn!("{}", err);
                return Err(err);
            }
        };
        let status = response.status();

        if self.blocked_statuses.contains(&status.as_u16()) {
            tracing::error!(
                "Provider blocked request: HTTP {} (profile {})",
                status,
                self.profile.name
            );
            return Err(Error::UpstreamBlocked { status });
        }

        tracing::debug!("Upstream responded: HTTP {}", status);
        Ok(response)
    }
}

/// Follow redirects up to the configured limit, refusing to be bounced onto
/// a forbidden host.
fn redirect_policy(config: &RelayConfig) -> redirect::Policy {
    let hosts = config.hosts.clone();
    let max = config.max_redirects;

    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max {
            attempt.error("too many redirects")
        } else if hosts.is_forbidden(attempt.url()) {
            attempt.error("redirect to forbidden host")
        } else {
            attempt.follow()
        }
    })
}
