pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod relay;
pub mod server;
pub mod stream;

pub use config::RelayConfig;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
