use crate::modules::provider::types::FetchOutcome;
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Boundary trait for the external metadata source.
///
/// `Ok(FetchOutcome::NotFound)` means the episode does not exist; `Err` means
/// the lookup failed for a transient reason and the caller may retry by its
/// own policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_episode(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> AppResult<FetchOutcome>;
}
