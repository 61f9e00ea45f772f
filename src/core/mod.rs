pub mod config;
pub mod errors;

pub use config::RagConfig;
pub use errors::RagError;
