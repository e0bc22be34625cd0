/// Episode discovery: job queue, worker loop, the season/episode walk and
/// the status facade.
pub mod algorithm;
pub mod config;
pub mod domain;
pub mod facade;
pub mod infrastructure;
pub mod ttl;
pub mod worker;

pub use algorithm::SeriesWalker;
pub use config::DiscoveryConfig;
pub use domain::{JobKind, JobProgress, JobRecord, JobRepository, JobStatus, NewJob, QueueStatistics};
pub use facade::{QueueStatus, SeriesStatus, SeriesStatusService};
pub use infrastructure::SqliteJobRepository;
pub use worker::{ActiveJob, DiscoveryWorker, WorkerStatistics};
