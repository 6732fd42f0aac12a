pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::ExtractorConfig;
pub use error::AppError;
pub use extract::ChessExtractor;
pub use models::{GameRecord, PlayerProfileRecord, PlayerStatusRecord, compute_hash};
pub use pipeline::{LoadInfo, LoadPackage, Pipeline, PipelineConfig, Resource};
pub use traits::{Destination, Fetcher, NullDestination};
