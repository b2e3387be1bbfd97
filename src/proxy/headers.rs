use anyhow::bail;
use reqwest::{
    RequestBuilder,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT},
};

const CHROME_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36";
const VLC_UA: &str = "VLC/3.0.20 LibVLC/3.0.20";

/// Outbound header set sent to the provider.
///
/// Providers allow-list clients by User-Agent and Referer, so which profile
/// works is a deployment decision. A request uses exactly one profile; there
/// is no fallback between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderProfile {
    pub name: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: Option<String>,
    /// `None` omits the header entirely.
    pub referer: Option<String>,
    pub connection: Option<String>,
}

impl HeaderProfile {
    /// Desktop Chrome with a web-player referer.
    pub fn browser() -> Self {
        Self {
            name: "browser".to_string(),
            user_agent: CHROME_UA.to_string(),
            accept: "*/*".to_string(),
            accept_language: Some("en-US,en;q=0.9".to_string()),
            referer: Some("http://my.splayer.in/".to_string()),
            connection: Some("keep-alive".to_string()),
        }
    }

    /// Desktop Chrome without a referer.
    pub fn bare() -> Self {
        Self {
            name: "bare".to_string(),
            referer: None,
            ..Self::browser()
        }
    }

    /// A native media player, for providers that reject browsers.
    pub fn player() -> Self {
        Self {
            name: "player".to_string(),
            user_agent: VLC_UA.to_string(),
            accept: "*/*".to_string(),
            accept_language: None,
            referer: None,
            connection: Some("keep-alive".to_string()),
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> anyhow::Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "browser" => Ok(Self::browser()),
            "bare" => Ok(Self::bare()),
            "player" => Ok(Self::player()),
            other => bail!("unknown header profile: {other}"),
        }
    }

    /// Apply the profile to an outbound request.
    pub fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        request = request
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, &self.accept);

        if let Some(lang) = &self.accept_language {
            request = request.header(ACCEPT_LANGUAGE, lang);
        }
        if let Some(referer) = &self.referer {
            request = request.header(REFERER, referer);
        }
        if let Some(connection) = &self.connection {
            request = request.header(CONNECTION, connection);
        }
        request
    }
}

impl Default for HeaderProfile {
    fn default() -> Self {
        Self::browser()
    }
}
