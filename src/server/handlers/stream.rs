use axum::{
    extract::{RawQuery, State},
    http::{
        HeaderMap, StatusCode,
        header::{self, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use crate::{
    Result,
    logging::{RelayState, RequestRecord},
    proxy::{read_manifest, relay_response},
    relay::{InboundRequest, RelayRequest, ResolvedTarget},
    server::{params::RelayParams, state::AppState},
    stream::{ManifestRewriter, RewriteContext, is_manifest},
};

/// Handle GET requests on the relay endpoint.
pub async fn handle_stream(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let mut record = RequestRecord::new(&state.config.base_path);
    let params = match RelayParams::from_query(query.as_deref().unwrap_or_default()) {
        Ok(params) => params,
        Err(err) => {
            record.fail(&err);
            return err.into_response();
        }
    };

    let inbound = InboundRequest::new(params, &headers);
    record = record.with_range(inbound.range.as_ref().and_then(|r| r.to_str().ok()));

    match relay(&state, inbound, &mut record).await {
        Ok(response) => {
            record.finish(response.status());
            response
        }
        Err(err) => {
            record.fail(&err);
            err.into_response()
        }
    }
}

/// Validate, resolve, fetch, then rewrite or pass through.
async fn relay(
    state: &AppState,
    inbound: InboundRequest,
    record: &mut RequestRecord,
) -> Result<Response> {
    let config = &state.config;

    let request = RelayRequest::validate(&inbound.params, &config.hosts)?;
    record.advance(RelayState::Validated);

    let target = ResolvedTarget::resolve(&request, config)?;
    record.set_target(
        request.content_type.as_str(),
        target.url().host_str(),
        request.direct_url.is_some(),
    );
    record.advance(RelayState::Resolved);

    record.advance(RelayState::Fetching);
    // Playlists are always fetched whole; a partial one cannot be rewritten.
    let range = if target.is_manifest_path() {
        None
    } else {
        inbound.range.as_ref()
    };
    let upstream = state.client.fetch(&target, range).await?;

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if upstream.status().is_success()
        && upstream.status() != StatusCode::PARTIAL_CONTENT
        && is_manifest(content_type.as_deref(), target.is_manifest_path())
    {
        record.advance(RelayState::ManifestRewrite);

        // Relative references resolve against where the playlist was
        // actually served from.
        let manifest_url = upstream.url().clone();
        let text = read_manifest(upstream, config.max_manifest_bytes).await?;

        let context = RewriteContext::new(manifest_url, request, config.base_path.as_str());
        let rewritten = ManifestRewriter::new(context).rewrite(&text);

        tracing::debug!("Rewrote manifest: {} -> {} bytes", text.len(), rewritten.len());

        return Ok((
            [
                (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            rewritten,
        )
            .into_response());
    }

    record.advance(RelayState::Passthrough);
    Ok(relay_response(upstream))
}
