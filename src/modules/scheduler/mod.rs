pub mod request_scheduler;

pub use request_scheduler::{RequestPriority, RequestScheduler, SchedulerConfig};
