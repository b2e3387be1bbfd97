use url::{Url, form_urlencoded};

use super::RelayRequest;
use crate::server::params::RelayParams;

/// A self-describing relay link for one media reference.
///
/// Carries the credential triple, the fully-resolved upstream URL and the
/// origin of the manifest it was found in, so the next hop can be resolved
/// without any server-side state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayUrl {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub direct_url: Url,
    pub manifest_origin: String,
}

impl RelayUrl {
    pub fn new(request: &RelayRequest, direct_url: Url, manifest_origin: String) -> Self {
        Self {
            server_url: request.server_url.clone(),
            username: request.username.clone(),
            password: request.password.clone(),
            direct_url,
            manifest_origin,
        }
    }

    /// Serialize as `<base_path>?serverUrl=..&username=..&password=..&directUrl=..&origin=..`.
    pub fn to_path(&self, base_path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("serverUrl", &self.server_url)
            .append_pair("username", &self.username)
            .append_pair("password", &self.password)
            .append_pair("directUrl", self.direct_url.as_str())
            .append_pair("origin", &self.manifest_origin)
            .finish();
        format!("{base_path}?{query}")
    }

    /// Recover the embedded upstream URL from a reference that is already a
    /// relay link for `base_path`.
    pub fn unwrap_direct(reference: &str, base_path: &str) -> Option<Url> {
        let query = reference.strip_prefix(base_path)?.strip_prefix('?')?;
        let direct = RelayParams::from_query(query).ok()?.direct_url?;
        Url::parse(&direct).ok()
    }
}
