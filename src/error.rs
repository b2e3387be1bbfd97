use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid serverUrl: {0}")]
    InvalidOriginUrl(String),

    #[error("Missing content id")]
    MissingContentId,

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Forbidden host: {0}")]
    ForbiddenHost(String),

    #[error("Origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("Provider blocked request ({status})")]
    UpstreamBlocked { status: StatusCode },

    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("Upstream request failed: {0}")]
    UpstreamTransport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Error {
    /// Taxonomy name reported in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_)
            | Self::InvalidParameter { .. }
            | Self::InvalidOriginUrl(_)
            | Self::MissingContentId => "ValidationError",
            Self::UnsupportedProtocol(_) => "UnsupportedProtocol",
            Self::ForbiddenHost(_) => "ForbiddenHost",
            Self::OriginMismatch { .. } => "OriginMismatch",
            Self::UpstreamBlocked { .. } => "UpstreamBlocked",
            Self::UpstreamTimeout | Self::UpstreamTransport(_) => "UpstreamTransportError",
            Self::Internal(_) => "UnexpectedError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_)
            | Self::InvalidParameter { .. }
            | Self::InvalidOriginUrl(_)
            | Self::MissingContentId
            | Self::UnsupportedProtocol(_)
            | Self::ForbiddenHost(_)
            | Self::OriginMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamBlocked { status } => *status,
            Self::UpstreamTimeout | Self::UpstreamTransport(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Internal details never leave the process.
            Self::Internal(_) => "Stream failed".to_string(),
            Self::UpstreamBlocked { status } => format!(
                "Provider blocked request ({}): IP blocking active or header profile rejected",
                status.as_u16()
            ),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.kind(),
            message: Some(self.public_message()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::UpstreamTimeout
        } else {
            // The upstream URL embeds credentials in its path.
            Self::UpstreamTransport(e.without_url().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_bad_request() {
        for err in [
            Error::MissingParameter("username"),
            Error::MissingContentId,
            Error::InvalidOriginUrl("nope".to_string()),
            Error::UnsupportedProtocol("ftp".to_string()),
            Error::ForbiddenHost("127.0.0.1".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(Error::MissingParameter("username").kind(), "ValidationError");
    }

    #[test]
    fn test_blocked_mirrors_upstream_status() {
        let status = StatusCode::from_u16(456).unwrap();
        let err = Error::UpstreamBlocked { status };
        assert_eq!(err.status_code().as_u16(), 456);
        assert_eq!(err.kind(), "UpstreamBlocked");
    }

    #[test]
    fn test_internal_message_is_sanitized() {
        let err = Error::Internal("connection pool poisoned at 10.0.0.4".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Stream failed");
    }
}
