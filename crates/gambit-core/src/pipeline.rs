use std::fmt;

use chrono::{DateTime, Utc};
use futures::stream::{LocalBoxStream, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{JsonObject, Record, compute_hash};
use crate::normalize::{normalize_identifier, normalize_row};
use crate::schema::TableSchema;
use crate::traits::Destination;

/// Column stamped on every row with the id of the package that loaded it.
pub const LOAD_ID_COLUMN: &str = "_load_id";
/// Column stamped on every row with the SHA-256 of the row content.
pub const RECORD_HASH_COLUMN: &str = "_record_hash";

/// A named stream of rows that becomes one warehouse table.
pub struct Resource<'a> {
    name: String,
    rows: LocalBoxStream<'a, Result<JsonObject, AppError>>,
}

impl<'a> Resource<'a> {
    pub fn new<S, R>(name: impl Into<String>, records: S) -> Self
    where
        S: Stream<Item = Result<R, AppError>> + 'a,
        R: Record + 'a,
    {
        Self {
            name: name.into(),
            rows: records.map_ok(R::into_row).boxed_local(),
        }
    }
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    /// Warehouse schema the tables are written into.
    pub dataset_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_name: "chess_data".to_string(),
            dataset_name: "chess_data".to_string(),
        }
    }
}

/// Rows of one resource after normalization, with their inferred columns.
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub name: String,
    pub schema: TableSchema,
    pub rows: Vec<JsonObject>,
}

/// Everything one run extracted, handed to a [`Destination`] as a unit.
#[derive(Debug, Clone, Serialize)]
pub struct LoadPackage {
    pub load_id: Uuid,
    pub pipeline_name: String,
    pub dataset_name: String,
    pub created_at: DateTime<Utc>,
    /// One entry per resource, in resource order.
    pub tables: Vec<TableData>,
}

impl LoadPackage {
    /// Number of resources in the package.
    pub fn count(&self) -> usize {
        self.tables.len()
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn summary(&self) -> LoadInfo {
        LoadInfo {
            load_id: self.load_id,
            dataset_name: self.dataset_name.clone(),
            resource_count: self.count(),
            resources_created: self.tables.iter().map(|t| t.name.clone()).collect(),
            row_counts: self
                .tables
                .iter()
                .map(|t| (t.name.clone(), t.rows.len()))
                .collect(),
        }
    }
}

/// Summary of a completed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadInfo {
    pub load_id: Uuid,
    pub dataset_name: String,
    pub resource_count: usize,
    /// Tables written by the package, in resource order.
    pub resources_created: Vec<String>,
    pub row_counts: Vec<(String, usize)>,
}

impl LoadInfo {
    pub fn total_rows(&self) -> usize {
        self.row_counts.iter().map(|(_, n)| n).sum()
    }
}

impl fmt::Display for LoadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Load completed! Loaded {} resources", self.resource_count)?;
        write!(f, "Tables: {}", self.resources_created.join(", "))
    }
}

/// Extracts resources into a [`LoadPackage`] and hands it to a destination.
///
/// Resources are drained one after another. The package reaches the
/// destination only once every resource has been drained without error, and
/// the destination commits it atomically, so a package lands exactly once or
/// not at all.
pub struct Pipeline<D: Destination> {
    destination: D,
    config: PipelineConfig,
}

impl<D: Destination> Pipeline<D> {
    pub fn new(destination: D, config: PipelineConfig) -> Self {
        Self {
            destination,
            config,
        }
    }

    /// Drain every resource into a new load package.
    pub async fn extract(&self, resources: Vec<Resource<'_>>) -> Result<LoadPackage, AppError> {
        let load_id = Uuid::new_v4();
        let load_id_str = load_id.to_string();
        let mut tables: Vec<TableData> = Vec::with_capacity(resources.len());

        for Resource { name, mut rows } in resources {
            let table = normalize_identifier(&name);
            if tables.iter().any(|t| t.name == table) {
                return Err(AppError::PipelineError(format!(
                    "Resource '{name}' maps to table '{table}' which is already in the package"
                )));
            }

            tracing::info!(resource = %name, "Extracting resource");
            let mut out = Vec::new();
            while let Some(row) = rows.next().await {
                let row = row.inspect_err(|e| {
                    tracing::error!(resource = %name, error = %e, "Extraction failed");
                })?;
                out.push(stamp_row(normalize_row(row), &load_id_str)?);
            }
            tracing::info!(resource = %name, %table, rows = out.len(), "Resource extracted");

            let schema = TableSchema::infer(&out);
            tables.push(TableData {
                name: table,
                schema,
                rows: out,
            });
        }

        Ok(LoadPackage {
            load_id,
            pipeline_name: self.config.pipeline_name.clone(),
            dataset_name: normalize_identifier(&self.config.dataset_name),
            created_at: Utc::now(),
            tables,
        })
    }

    /// Extract every resource, then load the package.
    pub async fn run(&self, resources: Vec<Resource<'_>>) -> Result<LoadInfo, AppError> {
        let package = self.extract(resources).await?;

        tracing::info!(
            load_id = %package.load_id,
            pipeline = %package.pipeline_name,
            dataset = %package.dataset_name,
            tables = package.count(),
            rows = package.row_count(),
            "Loading package"
        );
        let info = self.destination.load(&package).await?;
        tracing::info!(load_id = %info.load_id, rows = info.total_rows(), "Package loaded");

        Ok(info)
    }
}

/// Add `_record_hash` (over the normalized content) and `_load_id`.
fn stamp_row(mut row: JsonObject, load_id: &str) -> Result<JsonObject, AppError> {
    let hash = compute_hash(&serde_json::to_string(&canonical_object(&row))?);
    row.insert(RECORD_HASH_COLUMN.to_string(), hash.into());
    row.insert(LOAD_ID_COLUMN.to_string(), load_id.into());
    Ok(row)
}

/// Copy of `object` with keys sorted at every depth.
fn canonical_object(object: &JsonObject) -> JsonObject {
    let mut entries: Vec<_> = object.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), canonical_value(value)))
        .collect()
}

fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(canonical_object(object)),
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}
