/// External metadata provider boundary.
///
/// The rest of the system only sees the `MetadataProvider` trait and its
/// typed outcome; `OmdbClient` is the production implementation.
pub mod client;
pub mod omdb;
pub mod types;

pub use client::MetadataProvider;
pub use omdb::OmdbClient;
pub use types::{EpisodeData, FetchOutcome};

#[cfg(test)]
pub use client::MockMetadataProvider;
