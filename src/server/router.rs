use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE},
    },
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    handlers::{handle_stream, health_check},
    state::AppState,
};
use crate::config::RelayConfig;

/// Create the application router.
pub fn create_router(config: Arc<RelayConfig>) -> anyhow::Result<Router> {
    let cors = cors_layer(&config.cors_origin)?;
    let base_path = config.base_path.clone();
    let state = AppState::new(config).context("failed to build relay state")?;

    let app = Router::new()
        .route(&base_path, get(handle_stream))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Browser players read manifests and ranged bodies cross-origin, so the
/// range headers must be exposed.
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES]);

    if origin == "*" {
        Ok(layer.allow_origin(Any))
    } else {
        let origin = origin
            .parse::<HeaderValue>()
            .with_context(|| format!("invalid CORS_ALLOWED_ORIGIN: {origin}"))?;
        Ok(layer.allow_origin(origin))
    }
}
