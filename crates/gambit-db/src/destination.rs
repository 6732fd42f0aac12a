use chrono::{DateTime, Utc};
use gambit_core::error::AppError;
use gambit_core::pipeline::{LOAD_ID_COLUMN, LoadInfo, LoadPackage, RECORD_HASH_COLUMN, TableData};
use gambit_core::traits::Destination;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Pool, Postgres};
use uuid::Uuid;

/// Loads packages into PostgreSQL, one schema per dataset and one table per
/// resource.
///
/// A package is written in a single transaction: schema and table DDL, all
/// rows, and the `gambit_loads` record commit together or not at all.
#[derive(Clone)]
pub struct PostgresDestination {
    pool: Pool<Postgres>,
}

/// A committed load as recorded in `gambit_loads`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoadRecord {
    pub load_id: Uuid,
    pub pipeline_name: String,
    pub dataset_name: String,
    pub status: String,
    pub table_count: i32,
    pub row_count: i64,
    pub created_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

impl PostgresDestination {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write a package atomically and return its summary.
    pub async fn load_package(&self, package: &LoadPackage) -> Result<LoadInfo, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let dataset = quote_ident(&package.dataset_name);
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {dataset}"))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for table in &package.tables {
            write_table(&mut tx, &dataset, table).await.inspect_err(|e| {
                tracing::error!(table = %table.name, error = %e, "Table load failed, rolling back");
            })?;
        }

        sqlx::query(
            r#"
            INSERT INTO gambit_loads
                (load_id, pipeline_name, dataset_name, status, table_count, row_count, created_at)
            VALUES ($1, $2, $3, 'loaded', $4, $5, $6)
            "#,
        )
        .bind(package.load_id)
        .bind(&package.pipeline_name)
        .bind(&package.dataset_name)
        .bind(package.count() as i32)
        .bind(package.row_count() as i64)
        .bind(package.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            load_id = %package.load_id,
            dataset = %package.dataset_name,
            rows = package.row_count(),
            "Package committed"
        );
        Ok(package.summary())
    }

    /// Most recent committed loads for a dataset, newest first.
    pub async fn recent_loads(
        &self,
        dataset_name: &str,
        limit: usize,
    ) -> Result<Vec<LoadRecord>, AppError> {
        sqlx::query_as::<_, LoadRecord>(
            r#"
            SELECT load_id, pipeline_name, dataset_name, status, table_count, row_count,
                   created_at, inserted_at
            FROM gambit_loads
            WHERE dataset_name = $1
            ORDER BY inserted_at DESC
            LIMIT $2
            "#,
        )
        .bind(dataset_name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

/// Create or evolve one table, then insert its rows.
async fn write_table(
    conn: &mut PgConnection,
    dataset: &str,
    table: &TableData,
) -> Result<(), AppError> {
    let qualified = format!("{dataset}.{}", quote_ident(&table.name));

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {qualified} ({} TEXT, {} TEXT)",
        quote_ident(LOAD_ID_COLUMN),
        quote_ident(RECORD_HASH_COLUMN),
    ))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    // Additive only: existing columns keep their type.
    for column in &table.schema.columns {
        sqlx::query(&format!(
            "ALTER TABLE {qualified} ADD COLUMN IF NOT EXISTS {} {}",
            quote_ident(&column.name),
            column.data_type.sql_type(),
        ))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    }

    if table.rows.is_empty() {
        tracing::debug!(table = %table.name, "No rows to insert");
        return Ok(());
    }

    let column_list = table
        .schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let payload = Value::Array(table.rows.iter().cloned().map(Value::Object).collect());

    let result = sqlx::query(&format!(
        "INSERT INTO {qualified} ({column_list}) \
         SELECT {column_list} FROM jsonb_populate_recordset(NULL::{qualified}, $1)"
    ))
    .bind(payload)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    tracing::info!(table = %table.name, rows = result.rows_affected(), "Rows inserted");
    Ok(())
}

/// Double-quote an identifier, escaping embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

// -- Trait implementation --

impl Destination for PostgresDestination {
    async fn load(&self, package: &LoadPackage) -> Result<LoadInfo, AppError> {
        PostgresDestination::load_package(self, package).await
    }
}
