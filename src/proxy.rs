pub mod client;
pub mod headers;
pub mod passthrough;

pub use client::UpstreamClient;
pub use headers::HeaderProfile;
pub use passthrough::{read_manifest, relay_response};
