/// Domain entities for the episode discovery job queue.
///
/// A job targets a series, an optional season and an optional episode; the
/// kind decides how much of the series the worker walks.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job status enum matching the stored text values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Job kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    FullSeries,
    FullSeason,
    SingleEpisode,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::FullSeries => write!(f, "full_series"),
            JobKind::FullSeason => write!(f, "full_season"),
            JobKind::SingleEpisode => write!(f, "single_episode"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full_series" => Ok(JobKind::FullSeries),
            "full_season" => Ok(JobKind::FullSeason),
            "single_episode" => Ok(JobKind::SingleEpisode),
            _ => Err(format!("Invalid job kind: {}", s)),
        }
    }
}

/// Discovered counts reported by a finished job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub total_seasons: u32,
    pub total_episodes: u32,
}

/// New job to be queued (before insertion into the job table)
#[derive(Debug, Clone)]
pub struct NewJob {
    pub series_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub kind: JobKind,
    pub priority: i64,
    pub max_attempts: i64,
}

impl NewJob {
    /// Discover every season and episode of a series.
    pub fn full_series(series_id: impl Into<String>, priority: i64) -> Self {
        Self {
            series_id: series_id.into(),
            season: None,
            episode: None,
            kind: JobKind::FullSeries,
            priority,
            max_attempts: 3,
        }
    }

    /// Discover a single season.
    pub fn full_season(series_id: impl Into<String>, season: u32, priority: i64) -> Self {
        Self {
            series_id: series_id.into(),
            season: Some(season),
            episode: None,
            kind: JobKind::FullSeason,
            priority,
            max_attempts: 3,
        }
    }

    /// Refresh one episode.
    pub fn single_episode(
        series_id: impl Into<String>,
        season: u32,
        episode: u32,
        priority: i64,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            season: Some(season),
            episode: Some(episode),
            kind: JobKind::SingleEpisode,
            priority,
            max_attempts: 3,
        }
    }
}

/// Job record as stored in the job table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub series_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub kind: String,
    pub priority: i64,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub progress: Option<JobProgress>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn parse_kind(&self) -> Result<JobKind, String> {
        self.kind.parse()
    }

    pub fn parse_status(&self) -> Result<JobStatus, String> {
        self.status.parse()
    }

    /// Check if the job has retry attempts left
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_display() {
        assert_eq!(JobStatus::Queued.to_string(), "queued");
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn job_status_from_str() {
        assert_eq!("queued".parse::<JobStatus>().unwrap(), JobStatus::Queued);
        assert_eq!(
            "PROCESSING".parse::<JobStatus>().unwrap(),
            JobStatus::Processing
        );
        assert!("invalid".parse::<JobStatus>().is_err());
    }

    #[test]
    fn job_kind_round_trips() {
        for kind in [JobKind::FullSeries, JobKind::FullSeason, JobKind::SingleEpisode] {
            assert_eq!(kind.to_string().parse::<JobKind>().unwrap(), kind);
        }
    }

    #[test]
    fn full_series_job_has_no_season_or_episode() {
        let job = NewJob::full_series("tt0000001", 5);
        assert_eq!(job.kind, JobKind::FullSeries);
        assert_eq!(job.priority, 5);
        assert!(job.season.is_none());
        assert!(job.episode.is_none());
    }

    #[test]
    fn single_episode_job_targets_both_numbers() {
        let job = NewJob::single_episode("tt0000001", 2, 7, 1);
        assert_eq!(job.season, Some(2));
        assert_eq!(job.episode, Some(7));
    }

    #[test]
    fn job_record_can_retry() {
        let job = JobRecord {
            id: Uuid::new_v4(),
            series_id: "tt0000001".to_string(),
            season: None,
            episode: None,
            kind: "full_series".to_string(),
            priority: 5,
            status: "failed".to_string(),
            attempts: 2,
            max_attempts: 3,
            progress: None,
            error: Some("Test error".to_string()),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };

        assert!(job.can_retry());

        let exhausted = JobRecord { attempts: 3, ..job };
        assert!(!exhausted.can_retry());
    }
}
