use url::Url;

use super::request::{RelayRequest, check_url};
use crate::{
    Error, Result,
    config::{OriginCheck, RelayConfig},
};

/// Absolute upstream URL for one relay call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    url: Url,
}

impl ResolvedTarget {
    /// Compute the upstream URL for a validated request.
    ///
    /// A `directUrl` takes precedence over the content id.
    pub fn resolve(request: &RelayRequest, config: &RelayConfig) -> Result<Self> {
        let mut url = match request.direct_url.as_deref() {
            Some(direct) => Self::direct(direct, request, config)?,
            None => Self::build(request, config)?,
        };

        config.apply_host_aliases(&mut url);
        Ok(Self { url })
    }

    fn direct(direct: &str, request: &RelayRequest, config: &RelayConfig) -> Result<Url> {
        let url = Url::parse(direct).map_err(|e| Error::InvalidParameter {
            name: "directUrl",
            reason: e.to_string(),
        })?;
        check_url(&url, &config.hosts)?;

        if config.origin_check == OriginCheck::Strict
            && let Some(expected) = &request.expected_origin
        {
            let actual = url.origin();
            if &actual != expected {
                return Err(Error::OriginMismatch {
                    expected: expected.ascii_serialization(),
                    actual: actual.ascii_serialization(),
                });
            }
        }

        Ok(url)
    }

    fn build(request: &RelayRequest, config: &RelayConfig) -> Result<Url> {
        let id = request.content_id.as_deref().ok_or(Error::MissingContentId)?;
        let ext = request.extension.as_deref().unwrap_or_else(|| {
            config
                .extensions
                .default_for(request.content_type, request.stream_type.as_deref())
        });

        let file = format!("{id}.{ext}");
        let mut url = request.origin_base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| Error::InvalidOriginUrl("serverUrl cannot be a base".to_string()))?
            .clear()
            .extend([
                request.content_type.as_str(),
                request.username.as_str(),
                request.password.as_str(),
                file.as_str(),
            ]);

        Ok(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the path names an HLS playlist.
    pub fn is_manifest_path(&self) -> bool {
        self.url.path().to_lowercase().ends_with(".m3u8")
    }
}
