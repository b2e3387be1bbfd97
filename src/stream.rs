pub mod classifier;
pub mod context;
pub mod processor;

pub use classifier::{LineClassifier, LineType};
pub use context::RewriteContext;
pub use processor::{ManifestRewriter, is_manifest};
