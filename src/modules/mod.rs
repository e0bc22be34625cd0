pub mod cache;
pub mod catalog;
pub mod discovery;
pub mod provider;
pub mod scheduler;
