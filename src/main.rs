use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xtream_relay::{RelayConfig, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xtream_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(RelayConfig::from_env()?);
    let addr = config.bind_addr();

    tracing::info!(
        "Starting xtream-relay on {} (path {}, profile {}, origin check {:?})",
        addr,
        config.base_path,
        config.header_profile.name,
        config.origin_check
    );

    let app = server::create_router(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
