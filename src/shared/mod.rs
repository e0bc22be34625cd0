// Shared kernel: config, errors and infrastructure used by every module.

pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod utils;

// Re-exports for convenience
pub use infrastructure::database::{Database, DbPool};
