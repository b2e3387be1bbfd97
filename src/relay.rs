pub mod relay_url;
pub mod request;
pub mod target;

pub use relay_url::RelayUrl;
pub use request::{ContentType, InboundRequest, RelayRequest};
pub use target::ResolvedTarget;
