pub mod config;
pub mod database;
pub mod destination;

pub use config::DatabaseConfig;
pub use database::Database;
pub use destination::{LoadRecord, PostgresDestination};
