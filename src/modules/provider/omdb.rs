//! OMDb-backed metadata provider with built-in rate limiting.
//!
//! Episode lookups are keyed by IMDb series id plus season/episode query
//! parameters. The client enforces a token-bucket rate limit and retries
//! rate-limited or server-side failures a bounded number of times; anything
//! past that surfaces as a transient error for the caller to count.

use crate::modules::provider::client::MetadataProvider;
use crate::modules::provider::types::{EpisodeData, FetchOutcome};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::sleep;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

const MAX_RETRIES: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

pub struct OmdbClient {
    client: Client,
    rate_limiter: DirectRateLimiter,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    /// Create a client with the default OMDb rate budget (~1 req/sec with a
    /// small burst).
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_rate(api_key, base_url, 1.0, 3)
    }

    pub fn with_rate(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        requests_per_second: f64,
        burst_size: u32,
    ) -> Self {
        let period = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::from_secs(3600)
        };
        let burst = NonZeroU32::new(burst_size.max(1)).unwrap();
        let quota = Quota::with_period(period).unwrap().allow_burst(burst);

        Self {
            client: Client::new(),
            rate_limiter: RateLimiter::direct(quota),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_dto(&self, series_id: &str, season: u32, episode: u32) -> AppResult<OmdbEpisodeDto> {
        let season_param = season.to_string();
        let episode_param = episode.to_string();

        for attempt in 0..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("apikey", self.api_key.as_str()),
                    ("i", series_id),
                    ("Season", season_param.as_str()),
                    ("Episode", episode_param.as_str()),
                    ("plot", "full"),
                ])
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() == 429 || status.is_server_error() {
                        if attempt < MAX_RETRIES {
                            let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                            log::warn!(
                                "OMDb returned {} for {} S{}E{} (attempt {}/{}), retrying in {:?}",
                                status,
                                series_id,
                                season,
                                episode,
                                attempt + 1,
                                MAX_RETRIES + 1,
                                delay
                            );
                            sleep(delay).await;
                            continue;
                        }
                        return Err(if status.as_u16() == 429 {
                            AppError::RateLimitError(format!(
                                "OMDb rate limit held after {} attempts",
                                MAX_RETRIES + 1
                            ))
                        } else {
                            AppError::ExternalServiceError(format!("OMDb returned {}", status))
                        });
                    }

                    if !status.is_success() {
                        return Err(AppError::ApiError(format!("OMDb returned {}", status)));
                    }

                    return response
                        .json::<OmdbEpisodeDto>()
                        .await
                        .map_err(|e| AppError::SerializationError(format!(
                            "Failed to parse OMDb response: {}",
                            e
                        )));
                }
                Err(e) => {
                    if attempt < MAX_RETRIES {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                        log::warn!(
                            "OMDb request for {} S{}E{} failed (attempt {}/{}): {}. Retrying in {:?}",
                            series_id,
                            season,
                            episode,
                            attempt + 1,
                            MAX_RETRIES + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::ExternalServiceError(format!(
                        "OMDb request failed: {}",
                        e
                    )));
                }
            }
        }

        Err(AppError::InternalError(
            "OMDb retry loop exited unexpectedly".to_string(),
        ))
    }
}

#[async_trait]
impl MetadataProvider for OmdbClient {
    async fn fetch_episode(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> AppResult<FetchOutcome> {
        let dto = self.fetch_dto(series_id, season, episode).await?;
        dto.into_outcome(episode)
    }
}

/// Raw OMDb episode payload. Every field arrives as a string, with "N/A"
/// standing in for missing values.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OmdbEpisodeDto {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Writer")]
    writer: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

impl OmdbEpisodeDto {
    pub(crate) fn into_outcome(self, episode: u32) -> AppResult<FetchOutcome> {
        if self.response.eq_ignore_ascii_case("false") {
            let message = self.error.unwrap_or_else(|| "Unknown OMDb error".to_string());
            if message.to_lowercase().contains("not found") {
                return Ok(FetchOutcome::NotFound);
            }
            // Anything else (bad key, malformed id) is a real API failure
            return Err(AppError::ApiError(format!("OMDb error: {}", message)));
        }

        let title = clean(self.title).unwrap_or_else(|| format!("Episode {}", episode));

        Ok(FetchOutcome::Found(EpisodeData {
            title,
            plot: clean(self.plot),
            air_date: clean(self.released),
            runtime_minutes: clean(self.runtime).and_then(parse_runtime_minutes),
            rating: clean(self.imdb_rating).and_then(|r| r.parse::<f64>().ok()),
            actors: clean(self.actors),
            director: clean(self.director),
            writer: clean(self.writer),
            poster_url: clean(self.poster),
        }))
    }
}

/// OMDb uses "N/A" for absent fields.
fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse strings like "30 min" into minutes.
fn parse_runtime_minutes(runtime: String) -> Option<i64> {
    runtime
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<i64>().ok())
}
