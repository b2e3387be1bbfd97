use std::{fmt, time::Instant};

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Error;

/// Lifecycle of one relay call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    Validated,
    Resolved,
    Fetching,
    ManifestRewrite,
    Passthrough,
    Sent,
    Errored(&'static str),
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Errored(_))
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: RelayState) -> bool {
        use RelayState::*;
        match (self, next) {
            (_, Errored(_)) => !self.is_terminal(),
            (Received, Validated)
            | (Validated, Resolved)
            | (Resolved, Fetching)
            | (Fetching, ManifestRewrite)
            | (Fetching, Passthrough)
            | (ManifestRewrite, Sent)
            | (Passthrough, Sent) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Errored(kind) => write!(f, "Errored({kind})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A record of one relay call for logging purposes.
///
/// Never holds credentials or full upstream URLs.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub state: RelayState,
    pub content_type: Option<&'static str>,
    pub target_host: Option<String>,
    pub direct: bool,
    pub range: Option<String>,
    started: Instant,
}

impl RequestRecord {
    pub fn new(endpoint: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            endpoint: endpoint.to_string(),
            state: RelayState::Received,
            content_type: None,
            target_host: None,
            direct: false,
            range: None,
            started: Instant::now(),
        }
    }

    pub fn with_range(mut self, range: Option<&str>) -> Self {
        self.range = range.map(String::from);
        self
    }

    pub fn set_target(&mut self, content_type: &'static str, host: Option<&str>, direct: bool) {
        self.content_type = Some(content_type);
        self.target_host = host.map(String::from);
        self.direct = direct;
    }

    /// Move to the next state. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: RelayState) {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                request_id = %self.request_id,
                "Ignoring relay state transition {} -> {}",
                self.state,
                next
            );
            return;
        }
        tracing::debug!(
            request_id = %self.request_id,
            "Relay state {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Record a response handed to the client.
    pub fn finish(&mut self, status: StatusCode) {
        self.advance(RelayState::Sent);
        tracing::info!(
            request_id = %self.request_id,
            received_at = %self.timestamp.to_rfc3339(),
            endpoint = %self.endpoint,
            content_type = self.content_type.unwrap_or("-"),
            target_host = self.target_host.as_deref().unwrap_or("-"),
            direct = self.direct,
            range = self.range.as_deref().unwrap_or("-"),
            status = status.as_u16(),
            elapsed_ms = self.elapsed_ms() as u64,
            "Relay response sent"
        );
    }

    /// Record a failed call.
    pub fn fail(&mut self, err: &Error) {
        self.advance(RelayState::Errored(err.kind()));
        tracing::warn!(
            request_id = %self.request_id,
            endpoint = %self.endpoint,
            target_host = self.target_host.as_deref().unwrap_or("-"),
            status = err.status_code().as_u16(),
            elapsed_ms = self.elapsed_ms() as u64,
            "Relay failed: {}",
            err
        );
    }
}
