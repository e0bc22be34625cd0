//! Episode discovery and caching for a personal movie/TV collection tracker.
//!
//! The subsystem discovers the full season/episode structure of a series
//! from a metadata provider that only answers single-episode lookups, stores
//! what it finds, and serves reads through a multi-tier cache. Discovery runs
//! as background jobs drained by a single worker; all provider traffic flows
//! through a priority scheduler that enforces a request budget.

pub mod app;
pub mod modules;
pub mod shared;

pub use app::AppServices;
pub use shared::errors::{AppError, AppResult};
