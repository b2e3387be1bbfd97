use axum::http::{HeaderMap, HeaderValue, header::RANGE};
use url::{Origin, Url};

use crate::{Error, Result, config::HostPolicy, server::params::RelayParams};

/// Provider content category; selects the path prefix on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Movie,
    Live,
    Series,
}

impl ContentType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "live" => Some(Self::Live),
            "series" => Some(Self::Series),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Live => "live",
            Self::Series => "series",
        }
    }
}

/// The inbound call as one value: query parameters plus the client's range
/// header.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub params: RelayParams,
    pub range: Option<HeaderValue>,
}

impl InboundRequest {
    pub fn new(params: RelayParams, headers: &HeaderMap) -> Self {
        Self {
            params,
            range: headers.get(RANGE).cloned(),
        }
    }
}

/// A validated relay request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    /// `serverUrl` exactly as supplied; re-embedded in relay URLs.
    pub server_url: String,
    /// Parsed `serverUrl`.
    pub origin_base: Url,
    pub username: String,
    pub password: String,
    pub content_type: ContentType,
    pub content_id: Option<String>,
    pub extension: Option<String>,
    pub stream_type: Option<String>,
    pub direct_url: Option<String>,
    pub expected_origin: Option<Origin>,
}

impl RelayRequest {
    /// Validate inbound parameters. Performs no I/O.
    pub fn validate(params: &RelayParams, policy: &HostPolicy) -> Result<Self> {
        let server_url = required(&params.server_url, "serverUrl")?;
        let username = path_segment(required(&params.username, "username")?, "username")?;
        let password = path_segment(required(&params.password, "password")?, "password")?;

        let origin_base =
            Url::parse(server_url).map_err(|e| Error::InvalidOriginUrl(e.to_string()))?;
        check_url(&origin_base, policy)?;

        let content_type = match optional(&params.content_type) {
            Some(t) => ContentType::parse(t).ok_or_else(|| Error::InvalidParameter {
                name: "type",
                reason: format!("expected movie, live or series, got {t:?}"),
            })?,
            None => ContentType::default(),
        };

        let extension = optional(&params.ext).map(str::to_string);
        if let Some(ext) = &extension
            && !is_valid_extension(ext)
        {
            return Err(Error::InvalidParameter {
                name: "ext",
                reason: format!("{ext:?} is not a container extension"),
            });
        }

        let expected_origin = optional(&params.origin)
            .map(|o| {
                Url::parse(o)
                    .map(|u| u.origin())
                    .map_err(|e| Error::InvalidParameter {
                        name: "origin",
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            server_url: server_url.to_string(),
            origin_base,
            username: username.to_string(),
            password: password.to_string(),
            content_type,
            content_id: optional(&params.id).map(str::to_string),
            extension,
            stream_type: optional(&params.stream_type).map(str::to_string),
            direct_url: optional(&params.direct_url).map(str::to_string),
            expected_origin,
        })
    }
}

/// Check scheme and host of a URL the relay is about to fetch.
pub(crate) fn check_url(url: &Url, policy: &HostPolicy) -> Result<()> {
    if !policy.is_allowed_scheme(url.scheme()) {
        return Err(Error::UnsupportedProtocol(url.scheme().to_string()));
    }
    if policy.is_forbidden(url) {
        return Err(Error::ForbiddenHost(
            url.host_str().unwrap_or_default().to_string(),
        ));
    }
    Ok(())
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    optional(value).ok_or(Error::MissingParameter(name))
}

/// Credentials become whole path segments; dot segments would be collapsed
/// by URL normalisation and shift the path.
fn path_segment<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    if value == "." || value == ".." {
        return Err(Error::InvalidParameter {
            name,
            reason: format!("{value:?} is not a valid path segment"),
        });
    }
    Ok(value)
}

fn is_valid_extension(ext: &str) -> bool {
    (1..=8).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RelayParams {
        RelayParams {
            server_url: Some("http://provider.example:8080".to_string()),
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
            id: Some("42".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request() {
        let request = RelayRequest::validate(&params(), &HostPolicy::default()).unwrap();
        assert_eq!(request.content_type, ContentType::Movie);
        assert_eq!(request.content_id.as_deref(), Some("42"));
        assert_eq!(request.origin_base.host_str(), Some("provider.example"));
    }

    #[test]
    fn test_missing_credentials() {
        for field in ["serverUrl", "username", "password"] {
            let mut p = params();
            match field {
                "serverUrl" => p.server_url = None,
                "username" => p.username = Some(String::new()),
                _ => p.password = None,
            }
            let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
            assert!(matches!(err, Error::MissingParameter(name) if name == field));
        }
    }

    #[test]
    fn test_invalid_server_url() {
        let mut p = params();
        p.server_url = Some("not a url".to_string());
        let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidOriginUrl(_)));
    }

    #[test]
    fn test_unsupported_protocol() {
        let mut p = params();
        p.server_url = Some("ftp://provider.example/".to_string());
        let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedProtocol(s) if s == "ftp"));
    }

    #[test]
    fn test_forbidden_host() {
        let mut p = params();
        p.server_url = Some("http://127.0.0.1/player".to_string());
        let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::ForbiddenHost(h) if h == "127.0.0.1"));
    }

    #[test]
    fn test_unknown_content_type() {
        let mut p = params();
        p.content_type = Some("radio".to_string());
        let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "type", .. }));
    }

    #[test]
    fn test_extension_must_be_alphanumeric() {
        let mut p = params();
        p.ext = Some("mp4/../../x".to_string());
        let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "ext", .. }));
    }

    #[test]
    fn test_dot_segment_credentials_rejected() {
        for dots in [".", ".."] {
            let mut p = params();
            p.username = Some(dots.to_string());
            let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { name: "username", .. }));

            let mut p = params();
            p.password = Some(dots.to_string());
            let err = RelayRequest::validate(&p, &HostPolicy::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { name: "password", .. }));
        }

        // Dots inside a value are ordinary characters.
        let mut p = params();
        p.username = Some("a..b".to_string());
        assert!(RelayRequest::validate(&p, &HostPolicy::default()).is_ok());
    }

    #[test]
    fn test_empty_optionals_are_absent() {
        let mut p = params();
        p.ext = Some(String::new());
        p.origin = Some(String::new());
        p.content_type = Some(String::new());
        let request = RelayRequest::validate(&p, &HostPolicy::default()).unwrap();
        assert_eq!(request.extension, None);
        assert_eq!(request.expected_origin, None);
        assert_eq!(request.content_type, ContentType::Movie);
    }

    #[test]
    fn test_inbound_request_captures_range() {
        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=100-"));
        let inbound = InboundRequest::new(params(), &headers);
        assert_eq!(inbound.range.unwrap(), "bytes=100-");
    }
}
