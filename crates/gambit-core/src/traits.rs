use std::future::Future;

use crate::error::AppError;
use crate::pipeline::{LoadInfo, LoadPackage};

/// Fetches the raw body of a JSON API URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Persists a fully extracted load package.
///
/// Implementations must commit a package atomically: either every table and
/// the load record land, or nothing does.
pub trait Destination: Send + Sync {
    fn load(
        &self,
        package: &LoadPackage,
    ) -> impl Future<Output = Result<LoadInfo, AppError>> + Send;
}

/// A no-op Destination for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDestination;

impl Destination for NullDestination {
    async fn load(&self, package: &LoadPackage) -> Result<LoadInfo, AppError> {
        tracing::info!(load_id = %package.load_id, "Dry run, package not written");
        Ok(package.summary())
    }
}
