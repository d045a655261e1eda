//! Query execution against the VDP server.
//!
//! The VDP server exposes a PostgreSQL-compatible endpoint, so statements go
//! through a single-connection sqlx pool. Each call acquires the connection
//! for its own duration only.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{QueryRow, SqlValue, Statement};

/// Executes parameterized statements and returns positional rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs `statement` and collects every result row.
    async fn execute(&self, statement: Statement) -> AppResult<Vec<QueryRow>>;
}

/// Executor backed by a sqlx Postgres pool pointed at the VDP server.
pub struct VdpExecutor {
    pool: PgPool,
}

impl VdpExecutor {
    /// Creates the executor without opening a connection. The first
    /// statement establishes it.
    pub fn connect_lazy(config: &AppConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout())
            .connect_lazy_with(config.connect_options());

        tracing::info!(
            host = %config.vdp_host,
            port = config.vdp_port,
            database = %config.vdp_database,
            "VDP executor configured"
        );
        Self { pool }
    }

    /// Runs `SELECT 1` to verify the server is reachable.
    pub async fn ping(&self) -> AppResult<()> {
        self.execute(Statement::new("SELECT 1")).await?;
        tracing::info!(pool_size = self.pool.size(), "Successfully connected to VDP server");
        Ok(())
    }

    /// Closes the pool, waiting for the connection to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryExecutor for VdpExecutor {
    async fn execute(&self, statement: Statement) -> AppResult<Vec<QueryRow>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            tracing::error!(error = %e, "Connection error");
            AppError::DatabaseConnection(e.to_string())
        })?;

        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_value(query, param);
        }

        let rows = query.fetch_all(&mut *conn).await.map_err(|e| {
            tracing::error!(error = %e, sql = %statement.sql, "Query execution error");
            AppError::DatabaseQuery(e.to_string())
        })?;

        tracing::debug!(sql = %statement.sql, rows = rows.len(), "Statement executed");
        rows.iter().map(decode_row).collect()
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

fn decode_row(row: &PgRow) -> AppResult<QueryRow> {
    row.columns()
        .iter()
        .map(|column| decode_cell(row, column.ordinal(), column.type_info().name()))
        .collect::<AppResult<Vec<_>>>()
        .map(QueryRow::new)
}

fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> AppResult<SqlValue> {
    let decoded: Result<Option<SqlValue>, sqlx::Error> = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(SqlValue::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|n| SqlValue::Int(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|n| SqlValue::Int(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(SqlValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|n| SqlValue::Float(n.into()))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map(SqlValue::Float)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(SqlValue::Timestamp)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(naive_timestamp)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.and_then(|d| d.and_hms_opt(0, 0, 0)).map(naive_timestamp)),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(SqlValue::Text)),
    };

    into_cell(decoded, idx, type_name)
}

/// Zone-less timestamps are read as UTC, not as the host's local time, so a
/// run gives the same verdict on every host.
fn naive_timestamp(ts: NaiveDateTime) -> SqlValue {
    SqlValue::Timestamp(ts.and_utc())
}

/// SQL NULL becomes `SqlValue::Null`; a decode failure is a query error.
fn into_cell(
    decoded: Result<Option<SqlValue>, sqlx::Error>,
    idx: usize,
    type_name: &str,
) -> AppResult<SqlValue> {
    decoded.map(|v| v.unwrap_or(SqlValue::Null)).map_err(|e| {
        tracing::error!(column = idx, type_name, error = %e, "Column decode error");
        AppError::DatabaseQuery(format!("failed to decode column {} ({}): {}", idx, type_name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Arguments, Execute};

    #[test]
    fn test_decode_failure_is_query_error() {
        let decoded = Err(sqlx::Error::Decode("invalid utf-8".into()));
        let err = into_cell(decoded, 1, "NUMERIC").unwrap_err();
        match err {
            AppError::DatabaseQuery(msg) => {
                assert!(msg.contains("column 1 (NUMERIC)"));
                assert!(msg.contains("invalid utf-8"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_null_and_value_cells() {
        assert_eq!(into_cell(Ok(None), 0, "TIMESTAMP").unwrap(), SqlValue::Null);
        assert_eq!(
            into_cell(Ok(Some(SqlValue::Int(3))), 0, "INT8").unwrap(),
            SqlValue::Int(3)
        );
    }

    #[test]
    fn test_naive_timestamp_is_read_as_utc() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let value = naive_timestamp(naive);
        assert_eq!(
            value.as_timestamp().map(|ts| ts.to_rfc3339()),
            Some("2024-03-01T23:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_bind_value_binds_every_param() {
        let params = [
            SqlValue::Null,
            SqlValue::Bool(true),
            SqlValue::Int(7),
            SqlValue::Float(1.5),
            SqlValue::from("SALES"),
            SqlValue::Timestamp(Utc::now()),
        ];
        let mut query = sqlx::query("SELECT $1, $2, $3, $4, $5, $6");
        for param in &params {
            query = bind_value(query, param);
        }

        let arguments = query.take_arguments().unwrap().unwrap();
        assert_eq!(arguments.len(), params.len());
    }
}
