pub mod repository;

pub use repository::SqliteJobRepository;
