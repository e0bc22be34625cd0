use crate::shared::errors::{AppError, AppResult};
use std::env;

/// Deployment-level configuration sourced from the environment.
///
/// Component tunables (discovery heuristics, scheduler limits, cache sizing)
/// live in their own modules as config structs with defaults; this only
/// carries what genuinely differs per deployment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
}

impl AppConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            AppError::InvalidInput("DATABASE_URL environment variable not found".to_string())
        })?;

        let omdb_api_key = env::var("OMDB_API_KEY").map_err(|_| {
            AppError::InvalidInput("OMDB_API_KEY environment variable not found".to_string())
        })?;

        let omdb_base_url = env::var("OMDB_BASE_URL")
            .unwrap_or_else(|_| "https://www.omdbapi.com/".to_string());

        Ok(Self {
            database_url,
            omdb_api_key,
            omdb_base_url,
        })
    }
}
