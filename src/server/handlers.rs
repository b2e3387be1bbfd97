pub mod health;
pub mod stream;

pub use health::health_check;
pub use stream::handle_stream;
