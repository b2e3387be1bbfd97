use crate::{
    Result,
    relay::{RelayRequest, RelayUrl},
};
use url::Url;

/// Context for rewriting one manifest.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Absolute URL the manifest was served from (after redirects).
    pub manifest_url: Url,

    /// Path of the relay endpoint that rewritten links point to.
    pub base_path: String,

    /// Request the manifest was fetched for; supplies the credential triple.
    pub request: RelayRequest,
}

impl RewriteContext {
    pub fn new(manifest_url: Url, request: RelayRequest, base_path: impl Into<String>) -> Self {
        Self {
            manifest_url,
            base_path: base_path.into(),
            request,
        }
    }

    /// Resolve a reference against the manifest URL.
    ///
    /// A reference that is already a relay link resolves to the upstream URL
    /// it carries, so rewriting is idempotent.
    pub fn resolve_reference(&self, reference: &str) -> Result<Url> {
        if let Some(direct) = RelayUrl::unwrap_direct(reference, &self.base_path) {
            return Ok(direct);
        }
        self.manifest_url
            .join(reference)
            .map_err(|e| crate::Error::InvalidParameter {
                name: "manifest reference",
                reason: e.to_string(),
            })
    }

    /// Build the relay link for an absolute upstream URL.
    pub fn build_relay_url(&self, target: Url) -> String {
        let origin = self.manifest_url.origin().ascii_serialization();
        RelayUrl::new(&self.request, target, origin).to_path(&self.base_path)
    }
}
