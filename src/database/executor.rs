use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, PgPool, Row, TypeInfo};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::PreparedQuery;
use crate::database::value::SqlValue;

/// One decoded result row. Column names are shared across the rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl ResultRow {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Statement-executing connection the data store runs prepared queries on.
///
/// Dropping a returned future cancels the statement; request deadlines rely on that.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs a statement and returns the number of affected rows
    async fn execute(&self, query: &PreparedQuery) -> Result<u64, DatabaseError>;

    async fn fetch_all(&self, query: &PreparedQuery) -> Result<Vec<ResultRow>, DatabaseError>;

    /// First row only; the cursor is closed after it is read
    async fn fetch_optional(&self, query: &PreparedQuery) -> Result<Option<ResultRow>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// [`Executor`] over a sqlx Postgres pool
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
    query_logging: bool,
    slow_query_threshold: Duration,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_logging: false,
            slow_query_threshold: Duration::from_millis(1000),
        }
    }

    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.query_logging = enabled;
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind<'q>(&self, query: &'q PreparedQuery) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        if self.query_logging {
            tracing::debug!(sql = %query.sql, params = ?query.params, "executing statement");
        }
        let mut q = sqlx::query(&query.sql);
        for p in query.params.iter() {
            q = bind_param(q, p);
        }
        q
    }

    fn observe(&self, query: &PreparedQuery, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed >= self.slow_query_threshold {
            tracing::warn!(sql = %query.sql, elapsed_ms = elapsed.as_millis() as u64, "slow query");
        }
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, query: &PreparedQuery) -> Result<u64, DatabaseError> {
        let started = Instant::now();
        let result = self.bind(query).execute(&self.pool).await?;
        self.observe(query, started);
        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, query: &PreparedQuery) -> Result<Vec<ResultRow>, DatabaseError> {
        let started = Instant::now();
        let rows = self.bind(query).fetch_all(&self.pool).await?;
        self.observe(query, started);

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns = column_names(first);
        Ok(rows.iter().map(|row| decode_row(row, columns.clone())).collect())
    }

    async fn fetch_optional(&self, query: &PreparedQuery) -> Result<Option<ResultRow>, DatabaseError> {
        let started = Instant::now();
        let row = self.bind(query).fetch_optional(&self.pool).await?;
        self.observe(query, started);
        Ok(row.map(|row| {
            let columns = column_names(&row);
            decode_row(&row, columns)
        }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        // The builder inlines NULL; only hand-written queries reach this
        SqlValue::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.as_str()),
        SqlValue::Timestamp(ts) => q.bind(*ts),
        SqlValue::Json(v) => q.bind(v),
        // Never produced as a parameter; bind as text so placeholder counts stay aligned
        SqlValue::Unsupported(s) => q.bind(s.as_str()),
    }
}

fn column_names(row: &PgRow) -> Arc<[String]> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn decode_row(row: &PgRow, columns: Arc<[String]>) -> ResultRow {
    let values = (0..row.len()).map(|i| decode_column(row, i)).collect();
    ResultRow::new(columns, values)
}

/// Decodes a column by its Postgres type name. Types without a mapping become
/// [`SqlValue::Unsupported`] so that unmapped columns never fail a scan.
fn decode_column(row: &PgRow, i: usize) -> SqlValue {
    let type_name = row.column(i).type_info().name().to_string();

    let decoded: Result<SqlValue, sqlx::Error> = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(i).map(SqlValue::from),
        "INT2" => row
            .try_get::<Option<i16>, _>(i)
            .map(|v| v.map(|n| SqlValue::Int(n.into())).unwrap_or(SqlValue::Null)),
        "INT4" => row.try_get::<Option<i32>, _>(i).map(SqlValue::from),
        "INT8" => row.try_get::<Option<i64>, _>(i).map(SqlValue::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .map(|v| v.map(|n| SqlValue::Float(n.into())).unwrap_or(SqlValue::Null)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(SqlValue::from),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(i)
            .map(|v| v.map(|n| SqlValue::Text(n.to_string())).unwrap_or(SqlValue::Null)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT" => {
            row.try_get::<Option<String>, _>(i).map(SqlValue::from)
        }
        "TIMESTAMPTZ" => row.try_get::<Option<DateTime<Utc>>, _>(i).map(SqlValue::from),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)
            .map(|v| v.map(|ts| SqlValue::Timestamp(ts.and_utc())).unwrap_or(SqlValue::Null)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)
            .map(|v| v.map(|d| SqlValue::Text(d.to_string())).unwrap_or(SqlValue::Null)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(i)
            .map(|v| v.map(|u| SqlValue::Text(u.to_string())).unwrap_or(SqlValue::Null)),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(i)
            .map(|v| v.map(SqlValue::Json).unwrap_or(SqlValue::Null)),
        _ => return SqlValue::Unsupported(type_name),
    };

    decoded.unwrap_or_else(|e| {
        tracing::debug!(column = row.column(i).name(), error = %e, "column decode failed");
        SqlValue::Unsupported(type_name)
    })
}
