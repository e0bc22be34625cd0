use serde::{Deserialize, Serialize};

/// Episode metadata as returned by the external provider, already normalized
/// into typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeData {
    pub title: String,
    pub plot: Option<String>,
    pub air_date: Option<String>,
    pub runtime_minutes: Option<i64>,
    pub rating: Option<f64>,
    pub actors: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub poster_url: Option<String>,
}

/// Outcome of a provider lookup.
///
/// Transient failures (network, rate limit, 5xx) are reported as `Err` so the
/// discovery algorithm's branching is exhaustive: `Found`, `NotFound`, or a
/// retryable error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(EpisodeData),
    NotFound,
}

impl FetchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }
}
