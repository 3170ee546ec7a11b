use crate::config::Config;
use crate::errors::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::MySqlPool;
use std::time::Duration;
use tokio::time::Instant;

/// A positional statement parameter. Values are always bound, never
/// interpolated into the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl SqlValue {
    fn bind_to<'q>(&self, query: Query<'q, MySql, MySqlArguments>) -> Query<'q, MySql, MySqlArguments> {
        match self {
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::DateTime(ts) => query.bind(*ts),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value as i64)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::Int(value as i64)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::DateTime(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

/// Whether a statement is expected to produce rows or a write summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Fetch,
    Execute,
}

/// Result of a single statement execution.
#[derive(Debug, Default)]
pub struct QueryOutput {
    pub rows: Vec<MySqlRow>,
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Retry and observation knobs for the executor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first failed attempt.
    pub max_retries: u32,
    /// Base delay of the linear backoff; attempt N waits `retry_delay * N`.
    pub retry_delay: Duration,
    /// Successful queries slower than this are logged at warning level.
    pub slow_query_threshold: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            slow_query_threshold: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.db_max_retries,
            retry_delay: Duration::from_millis(config.db_retry_delay_ms),
            slow_query_threshold: Duration::from_millis(config.db_slow_query_ms),
        }
    }
}

/// A connection leased for a single statement. Dropping the lease returns
/// the connection to its pool; the retry loop scopes every lease so the
/// return happens on all exit paths.
pub(crate) trait Leased: Send {
    async fn run(
        &mut self,
        kind: StatementKind,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryOutput, sqlx::Error>;
}

/// Hands out leased connections. Implemented by the sqlx pool in production
/// and by a scripted mock in tests.
pub(crate) trait ConnectionSource: Send + Sync {
    type Conn: Leased;
    async fn acquire(&self) -> Result<Self::Conn, sqlx::Error>;
}

struct SqlxSource {
    pool: MySqlPool,
}

struct SqlxLease {
    conn: PoolConnection<MySql>,
}

impl ConnectionSource for SqlxSource {
    type Conn = SqlxLease;

    async fn acquire(&self) -> Result<SqlxLease, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        Ok(SqlxLease { conn })
    }
}

impl Leased for SqlxLease {
    async fn run(
        &mut self,
        kind: StatementKind,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryOutput, sqlx::Error> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = value.bind_to(query);
        }

        match kind {
            StatementKind::Fetch => {
                let rows = query.fetch_all(&mut *self.conn).await?;
                Ok(QueryOutput {
                    rows,
                    ..Default::default()
                })
            }
            StatementKind::Execute => {
                let result = query.execute(&mut *self.conn).await?;
                Ok(QueryOutput {
                    rows: Vec::new(),
                    rows_affected: result.rows_affected(),
                    last_insert_id: result.last_insert_id(),
                })
            }
        }
    }
}

/// Runs a statement with bounded retries and linear backoff.
///
/// Each attempt acquires a fresh connection, runs the statement, and releases
/// the connection before any backoff sleep. Acquisition failures are subject
/// to the same retry policy as statement failures. Non-retryable errors and
/// final-attempt failures propagate immediately.
pub(crate) async fn run_with_retries<S: ConnectionSource>(
    source: &S,
    policy: &RetryPolicy,
    kind: StatementKind,
    sql: &str,
    params: &[SqlValue],
) -> Result<QueryOutput, AppError> {
    let mut attempt: u32 = 0;
    loop {
        let started = Instant::now();

        let outcome = match source.acquire().await {
            Ok(mut conn) => conn
                .run(kind, sql, params)
                .await
                .map_err(AppError::from_statement),
            Err(err) => Err(AppError::from_acquire(err)),
        };
        // The lease, if one was acquired, has been returned to the pool here.
        let duration = started.elapsed();

        match outcome {
            Ok(output) => {
                if duration > policy.slow_query_threshold {
                    tracing::warn!("Slow query took {}ms: {}", duration.as_millis(), sql);
                }
                tracing::debug!(
                    "Query succeeded on attempt {} ({}ms)",
                    attempt + 1,
                    duration.as_millis()
                );
                return Ok(output);
            }
            Err(err) => {
                tracing::error!(
                    "Query failed on attempt {} ({}ms): {}",
                    attempt + 1,
                    duration.as_millis(),
                    err
                );

                if !err.is_retryable() || attempt == policy.max_retries {
                    return Err(err);
                }

                attempt += 1;
                let delay = policy.retry_delay * attempt;
                tracing::warn!("Retrying query in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Centralized query execution with pooled connections, bounded retries and
/// guaranteed connection release. The only layer permitted to retry.
pub struct QueryExecutor {
    source: SqlxSource,
    policy: RetryPolicy,
}

impl QueryExecutor {
    pub fn new(pool: MySqlPool, policy: RetryPolicy) -> Self {
        Self {
            source: SqlxSource { pool },
            policy,
        }
    }

    /// Runs a row-producing statement and returns all rows.
    pub async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<MySqlRow>, AppError> {
        let output =
            run_with_retries(&self.source, &self.policy, StatementKind::Fetch, sql, params).await?;
        Ok(output.rows)
    }

    /// Runs a row-producing statement and returns the first row, if any.
    /// Absence is not an error; callers decide whether it is exceptional.
    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<MySqlRow>, AppError> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows.into_iter().next())
    }

    /// Runs a write statement and returns the affected-row summary.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, AppError> {
        run_with_retries(&self.source, &self.policy, StatementKind::Execute, sql, params).await
    }
}
