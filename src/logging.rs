pub mod record;

pub use record::{RelayState, RequestRecord};
