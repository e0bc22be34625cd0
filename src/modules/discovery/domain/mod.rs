pub mod entities;
pub mod repository;

pub use entities::{JobKind, JobProgress, JobRecord, JobStatus, NewJob};
pub use repository::{JobRepository, QueueStatistics};
