/// Episode and series metadata stores.
pub mod entities;
pub mod infrastructure;
pub mod store;

pub use entities::{EpisodeRecord, SeriesMetadata};
pub use infrastructure::{SqliteEpisodeStore, SqliteSeriesStore};
pub use store::{EpisodeStore, SeriesStore};
