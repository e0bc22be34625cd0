pub mod database;

pub use database::{create_schema, Database, DbPool};
