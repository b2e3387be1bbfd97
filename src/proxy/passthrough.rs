use axum::{
    body::Body,
    http::{
        HeaderValue,
        header::{ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE},
    },
    response::Response,
};
use futures::TryStreamExt;

use crate::{Error, Result};

/// Upstream headers copied onto the client response when present.
const FORWARDED_HEADERS: [axum::http::HeaderName; 4] =
    [CONTENT_TYPE, CONTENT_LENGTH, ACCEPT_RANGES, CONTENT_RANGE];

/// Relay an upstream response to the client without buffering.
///
/// Status (including 206) and range headers are preserved so seeking works.
/// The body is forwarded chunk by chunk; dropping the client response drops
/// the upstream connection with it.
pub fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut forwarded = Vec::with_capacity(FORWARDED_HEADERS.len());
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            forwarded.push((name, value.clone()));
        }
    }

    let stream = upstream.bytes_stream().inspect_err(|e| {
        tracing::warn!("Upstream body stream failed: {}", e);
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in forwarded {
        headers.insert(name, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    response
}

/// Buffer a playlist body, giving up once it grows past `limit` bytes.
///
/// Reads chunk by chunk so an endless body is cut off instead of held in
/// memory. Invalid UTF-8 is replaced rather than rejected.
pub async fn read_manifest(upstream: reqwest::Response, limit: usize) -> Result<String> {
    let too_large = || Error::UpstreamTransport(format!("manifest exceeds {limit} bytes"));

    if upstream
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    let mut stream = upstream.bytes_stream();
    while let Some(chunk) = stream.try_next().await? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn upstream(status: u16, headers: &[(&str, &str)], body: &'static str) -> reqwest::Response {
        let mut builder = axum::http::Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        reqwest::Response::from(builder.body(body).unwrap())
    }

    #[tokio::test]
    async fn test_partial_content_is_preserved() {
        let response = relay_response(upstream(
            206,
            &[
                ("content-type", "video/mp4"),
                ("content-range", "bytes 100-104/1000"),
                ("accept-ranges", "bytes"),
                ("set-cookie", "session=provider"),
            ],
            "abcde",
        ));

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes 100-104/1000");
        assert_eq!(response.headers()[ACCEPT_RANGES], "bytes");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");
        assert!(response.headers().get("set-cookie").is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"abcde");
    }

    #[tokio::test]
    async fn test_absent_headers_are_not_invented() {
        let response = relay_response(upstream(200, &[], "x"));

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_RANGE).is_none());
        assert!(response.headers().get(ACCEPT_RANGES).is_none());
    }

    #[tokio::test]
    async fn test_read_manifest_within_limit() {
        let text = read_manifest(upstream(200, &[], "#EXTM3U\nseg.ts"), 64)
            .await
            .unwrap();
        assert_eq!(text, "#EXTM3U\nseg.ts");
    }

    #[tokio::test]
    async fn test_read_manifest_over_limit() {
        let err = read_manifest(upstream(200, &[], "#EXTM3U\nsegment-with-a-long-name.ts"), 16)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UpstreamTransportError");
    }
}
