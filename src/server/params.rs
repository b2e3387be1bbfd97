use serde::Deserialize;

use crate::{Error, Result};

/// Query parameters for the relay endpoint.
///
/// Every field is optional at this level so that missing values surface as
/// relay validation errors. The handler parses the raw query with
/// [`RelayParams::from_query`] so malformed input does too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayParams {
    /// Base URL of the provider, e.g. `http://provider.example:8080`.
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Content type: movie, live or series.
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,

    /// Stream, VOD or episode id.
    #[serde(default)]
    pub id: Option<String>,

    /// Container extension, e.g. mp4, mkv, ts, m3u8.
    #[serde(default)]
    pub ext: Option<String>,

    /// Provider stream-type hint; `hls` selects playlists for live channels.
    #[serde(default)]
    pub stream_type: Option<String>,

    /// Absolute upstream URL, used for references found inside manifests.
    #[serde(default)]
    pub direct_url: Option<String>,

    /// Origin the `directUrl` must belong to.
    #[serde(default)]
    pub origin: Option<String>,
}

impl RelayParams {
    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// Unknown keys are ignored. A known key given more than once is an
    /// [`Error::InvalidParameter`].
    pub fn from_query(query: &str) -> Result<Self> {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let (name, slot) = match key.as_ref() {
                "serverUrl" => ("serverUrl", &mut params.server_url),
                "username" => ("username", &mut params.username),
                "password" => ("password", &mut params.password),
                "type" => ("type", &mut params.content_type),
                "id" => ("id", &mut params.id),
                "ext" => ("ext", &mut params.ext),
                "streamType" => ("streamType", &mut params.stream_type),
                "directUrl" => ("directUrl", &mut params.direct_url),
                "origin" => ("origin", &mut params.origin),
                _ => continue,
            };
            if slot.is_some() {
                return Err(Error::InvalidParameter {
                    name,
                    reason: "given more than once".to_string(),
                });
            }
            *slot = Some(value.into_owned());
        }
        Ok(params)
    }
}
