use super::{classifier::LineClassifier, context::RewriteContext};

/// Whether an upstream response is an HLS playlist.
pub fn is_manifest(content_type: Option<&str>, path_is_manifest: bool) -> bool {
    path_is_manifest
        || content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"))
}

/// Rewrites every media reference of a playlist into a relay link.
pub struct ManifestRewriter {
    context: RewriteContext,
}

impl ManifestRewriter {
    pub fn new(context: RewriteContext) -> Self {
        Self { context }
    }

    /// Rewrite an entire playlist.
    ///
    /// Lines are split on `\n` only so tags, comments and blank lines
    /// (including any `\r`) come out byte-identical.
    pub fn rewrite(&self, input: &str) -> String {
        input
            .split('\n')
            .map(|line| self.rewrite_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rewrite a single line.
    pub fn rewrite_line(&self, line: &str) -> String {
        if LineClassifier::classify(line).is_passthrough() {
            return line.to_string();
        }

        let line_ending = if line.ends_with('\r') { "\r" } else { "" };
        let reference = line.trim();

        match self.context.resolve_reference(reference) {
            Ok(resolved) => {
                let mut rewritten = self.context.build_relay_url(resolved);
                rewritten.push_str(line_ending);
                rewritten
            }
            Err(e) => {
                tracing::debug!("Leaving unresolvable reference as-is: {}", e);
                line.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HostPolicy,
        relay::{RelayRequest, RelayUrl},
        server::params::RelayParams,
        stream::LineType,
    };
    use url::Url;

    const BASE_PATH: &str = "/api/stream";

    fn create_rewriter() -> ManifestRewriter {
        let params = RelayParams {
            server_url: Some("http://provider.example:8080".to_string()),
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
            content_type: Some("live".to_string()),
            id: Some("7".to_string()),
            ext: Some("m3u8".to_string()),
            ..Default::default()
        };
        let request = RelayRequest::validate(&params, &HostPolicy::default()).unwrap();
        let manifest_url =
            Url::parse("https://edge.provider.example/live/alice/secret/7.m3u8").unwrap();
        ManifestRewriter::new(RewriteContext::new(manifest_url, request, BASE_PATH))
    }

    fn embedded(line: &str) -> Url {
        RelayUrl::unwrap_direct(line, BASE_PATH).expect("relay link")
    }

    #[test]
    fn test_rewrites_media_lines_only() {
        let rewriter = create_rewriter();
        let input = "#EXTM3U\n\nsegment1.ts\nhttps://cdn.example/segment2.ts";
        let output = rewriter.rewrite(input);
        let lines: Vec<&str> = output.split('\n').collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "");
        assert_eq!(
            embedded(lines[2]).as_str(),
            "https://edge.provider.example/live/alice/secret/segment1.ts"
        );
        assert_eq!(embedded(lines[3]).as_str(), "https://cdn.example/segment2.ts");
    }

    #[test]
    fn test_relay_link_carries_manifest_origin() {
        let rewriter = create_rewriter();
        let line = rewriter.rewrite_line("https://cdn.example/segment2.ts");
        let params = RelayParams::from_query(line.split_once('?').unwrap().1).unwrap();

        assert_eq!(
            params.origin.as_deref(),
            Some("https://edge.provider.example")
        );
        assert_eq!(
            params.server_url.as_deref(),
            Some("http://provider.example:8080")
        );
        assert_eq!(params.username.as_deref(), Some("alice"));
        assert_eq!(params.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_tags_and_comments_are_byte_identical() {
        let rewriter = create_rewriter();
        let input = "#EXTM3U\r\n#EXT-X-TARGETDURATION:10\r\n# note  \r\n   \r\n#EXTINF:9.8,\r\nseg.ts\r\n";
        let output = rewriter.rewrite(input);
        let input_lines: Vec<&str> = input.split('\n').collect();
        let output_lines: Vec<&str> = output.split('\n').collect();

        assert_eq!(input_lines.len(), output_lines.len());
        for (i, o) in input_lines.iter().zip(&output_lines) {
            if LineClassifier::classify(i).is_passthrough() {
                assert_eq!(i, o);
            }
        }
        assert!(output_lines[5].starts_with("/api/stream?"));
        assert!(output_lines[5].ends_with('\r'));
        assert!(output.ends_with("\r\n"));
    }

    #[test]
    fn test_rewrite_is_stable() {
        let rewriter = create_rewriter();
        let input = "#EXTM3U\n#EXTINF:10,\n../hls/segment1.ts?token=abc\nhttps://cdn.example/segment2.ts";
        let once = rewriter.rewrite(input);
        let twice = rewriter.rewrite(&once);

        for (a, b) in once.split('\n').zip(twice.split('\n')) {
            if LineClassifier::classify(a) == LineType::MediaReference {
                assert_eq!(embedded(a), embedded(b));
            } else {
                assert_eq!(a, b);
            }
        }
        assert_eq!(
            embedded(once.split('\n').nth(2).unwrap()).as_str(),
            "https://edge.provider.example/live/alice/hls/segment1.ts?token=abc"
        );
    }

    #[test]
    fn test_is_manifest() {
        assert!(is_manifest(Some("application/vnd.apple.mpegurl"), false));
        assert!(is_manifest(Some("audio/x-mpegURL; charset=utf-8"), false));
        assert!(is_manifest(None, true));
        assert!(!is_manifest(Some("video/mp2t"), false));
        assert!(!is_manifest(None, false));
    }
}
