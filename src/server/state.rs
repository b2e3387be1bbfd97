use crate::{Result, config::RelayConfig, proxy::UpstreamClient};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub client: UpstreamClient,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: Arc<RelayConfig>) -> Result<Self> {
        Ok(Self {
            client: UpstreamClient::new(&config)?,
            config,
        })
    }
}
