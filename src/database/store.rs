use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::DatabaseConfig;
use crate::database::executor::{Executor, PgExecutor, ResultRow};
use crate::database::manager::DatabaseError;
use crate::database::pagination::{Page, Paginate};
use crate::database::query_builder::{PreparedQuery, QueryBuilder, Statement, ID_COLUMN};
use crate::database::record::{map_one, map_rows, Record};
use crate::database::value::{FromSqlValue, ValueError};

/// Single-table CRUD over an [`Executor`].
///
/// Cloning is cheap; every clone shares the same executor and clock. Each
/// operation builds its statement with [`QueryBuilder`] and decodes rows with
/// the record mapper. Writes that touch zero rows fail with
/// [`DatabaseError::NotModified`] instead of succeeding silently.
#[derive(Clone)]
pub struct DataStore {
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
}

impl DataStore {
    pub fn new(executor: Arc<dyn Executor>, clock: Arc<dyn Clock>) -> Self {
        Self { executor, clock }
    }

    /// Store over a live Postgres pool with the configured statement logging
    pub fn postgres(pool: PgPool, config: &DatabaseConfig) -> Self {
        let executor = PgExecutor::new(pool)
            .with_query_logging(config.enable_query_logging)
            .with_slow_query_threshold(Duration::from_millis(config.slow_query_threshold_ms));
        Self::new(Arc::new(executor), Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Insert and return the generated id
    pub async fn create(&self, builder: &QueryBuilder) -> Result<i64, DatabaseError> {
        let query = builder.build(Statement::Insert)?;
        debug!(table = builder.table_name(), "create");

        let row = self
            .executor
            .fetch_optional(&query)
            .await?
            .ok_or_else(|| DatabaseError::NotModified {
                operation: Statement::Insert.operation(),
                table: builder.table_name().to_string(),
            })?;

        scalar(row, ID_COLUMN)
    }

    pub async fn update(&self, builder: &QueryBuilder) -> Result<(), DatabaseError> {
        self.write(builder, Statement::Update).await.map(|_| ())
    }

    /// Tombstone one row by primary key
    pub async fn soft_delete(&self, table: &str, id: i64) -> Result<(), DatabaseError> {
        let builder = QueryBuilder::table(table)?.filter(ID_COLUMN, id);
        self.soft_delete_where(&builder).await.map(|_| ())
    }

    /// Tombstone every active row matching the builder's conditions; returns the
    /// number of rows stamped. At least one condition is required.
    pub async fn soft_delete_where(&self, builder: &QueryBuilder) -> Result<u64, DatabaseError> {
        let at = self.clock.now();
        self.write(builder, Statement::SoftDelete { at }).await
    }

    /// Physically remove one row by primary key
    pub async fn hard_delete(&self, table: &str, id: i64) -> Result<(), DatabaseError> {
        let builder = QueryBuilder::table(table)?.filter(ID_COLUMN, id);
        self.write(&builder, Statement::Delete).await.map(|_| ())
    }

    /// First matching row, or `NotFound`
    pub async fn find<R: Record>(&self, builder: &QueryBuilder) -> Result<R, DatabaseError> {
        let query = builder.build(Statement::Select)?;
        debug!(table = builder.table_name(), "find");

        match self.executor.fetch_optional(&query).await? {
            Some(row) => map_one(row),
            None => Err(DatabaseError::NotFound {
                table: builder.table_name().to_string(),
            }),
        }
    }

    /// Every matching row; empty when nothing matches
    pub async fn get<R: Record>(&self, builder: &QueryBuilder) -> Result<Vec<R>, DatabaseError> {
        let query = builder.build(Statement::Select)?;
        debug!(table = builder.table_name(), "get");
        map_rows(self.executor.fetch_all(&query).await?)
    }

    /// Rows `offset..offset+limit`, newest id first
    pub async fn paginate<R: Record>(
        &self,
        builder: &QueryBuilder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<R>, DatabaseError> {
        let windowed = builder.clone().window(offset, limit);
        self.get(&windowed).await
    }

    /// Counts first, clamps the requested page into range, then fetches that page
    pub async fn paginate_page<R: Record>(
        &self,
        builder: &QueryBuilder,
        page: i64,
        limit: i64,
    ) -> Result<Page<R>, DatabaseError> {
        let total = self.count(builder).await?;
        let cursor = Paginate::calculate(page, total, limit);
        let items = self.paginate(builder, cursor.offset, cursor.row).await?;
        Ok(Page { items, cursor })
    }

    pub async fn count(&self, builder: &QueryBuilder) -> Result<i64, DatabaseError> {
        let query = builder.build(Statement::Count)?;
        self.count_query(builder, query).await
    }

    /// Succeeds when at least one row matches, else `NotFoundCondition`
    pub async fn exists_in_table(&self, builder: &QueryBuilder) -> Result<(), DatabaseError> {
        let query = builder.build(Statement::Exists)?;
        if self.count_query(builder, query).await? == 0 {
            return Err(DatabaseError::NotFoundCondition {
                table: builder.table_name().to_string(),
            });
        }
        Ok(())
    }

    /// Succeeds when no row matches, else `AlreadyExists`
    pub async fn not_exists_in_table(&self, builder: &QueryBuilder) -> Result<(), DatabaseError> {
        let query = builder.build(Statement::Exists)?;
        if self.count_query(builder, query).await? > 0 {
            return Err(DatabaseError::AlreadyExists {
                table: builder.table_name().to_string(),
            });
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.executor.ping().await
    }

    async fn write(&self, builder: &QueryBuilder, statement: Statement) -> Result<u64, DatabaseError> {
        let query = builder.build(statement)?;
        let operation = statement.operation();
        debug!(table = builder.table_name(), %operation, "write");

        let affected = self.executor.execute(&query).await?;
        if affected == 0 {
            return Err(DatabaseError::NotModified {
                operation,
                table: builder.table_name().to_string(),
            });
        }
        Ok(affected)
    }

    async fn count_query(
        &self,
        builder: &QueryBuilder,
        query: PreparedQuery,
    ) -> Result<i64, DatabaseError> {
        debug!(table = builder.table_name(), "count");
        match self.executor.fetch_optional(&query).await? {
            Some(row) => scalar(row, "count"),
            None => Ok(0),
        }
    }
}

/// Decode a single-column result, preferring the named column
fn scalar<T: FromSqlValue>(row: ResultRow, column: &str) -> Result<T, DatabaseError> {
    let value = match row.get(column) {
        Some(value) => value.clone(),
        None => row.into_values().into_iter().next().ok_or_else(|| DatabaseError::Scan {
            column: column.to_string(),
            source: ValueError::Mismatch {
                expected: "a value",
                found: "no columns",
            },
        })?,
    };

    T::from_sql_value(value).map_err(|source| DatabaseError::Scan {
        column: column.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::value::SqlValue;
    use crate::types::Operation;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Reply {
        Affected(u64),
        Rows(Vec<ResultRow>),
    }

    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
        seen: Mutex<Vec<PreparedQuery>>,
    }

    impl Scripted {
        fn reply(self, reply: Reply) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        fn next(&self, query: &PreparedQuery) -> Reply {
            self.seen.lock().unwrap().push(query.clone());
            self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Rows(Vec::new()))
        }

        fn statements(&self) -> Vec<PreparedQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for Scripted {
        async fn execute(&self, query: &PreparedQuery) -> Result<u64, DatabaseError> {
            match self.next(query) {
                Reply::Affected(n) => Ok(n),
                Reply::Rows(rows) => Ok(rows.len() as u64),
            }
        }

        async fn fetch_all(&self, query: &PreparedQuery) -> Result<Vec<ResultRow>, DatabaseError> {
            match self.next(query) {
                Reply::Rows(rows) => Ok(rows),
                Reply::Affected(_) => Ok(Vec::new()),
            }
        }

        async fn fetch_optional(&self, query: &PreparedQuery) -> Result<Option<ResultRow>, DatabaseError> {
            self.fetch_all(query).await.map(|rows| rows.into_iter().next())
        }

        async fn ping(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Note {
        id: i64,
        body: String,
    }

    crate::record!(Note { id, body });

    fn row(columns: &[&str], values: Vec<SqlValue>) -> ResultRow {
        ResultRow::new(columns.iter().map(|c| c.to_string()).collect(), values)
    }

    fn store(executor: Arc<Scripted>) -> DataStore {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        DataStore::new(executor, Arc::new(clock))
    }

    fn notes() -> QueryBuilder {
        QueryBuilder::table("notes").unwrap()
    }

    #[tokio::test]
    async fn create_returns_generated_id() {
        let exec = Arc::new(Scripted::default().reply(Reply::Rows(vec![row(&["id"], vec![SqlValue::Int(42)])])));
        let id = store(exec.clone()).create(&notes().set("body", "hi")).await.unwrap();
        assert_eq!(id, 42);
        assert!(exec.statements()[0].sql.ends_with(r#"RETURNING "id""#));
    }

    #[tokio::test]
    async fn create_without_fields_never_reaches_the_executor() {
        let exec = Arc::new(Scripted::default());
        let err = store(exec.clone()).create(&notes()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
        assert!(exec.statements().is_empty());
    }

    #[tokio::test]
    async fn unscoped_update_never_reaches_the_executor() {
        let exec = Arc::new(Scripted::default());
        let store = store(exec.clone());
        assert!(store.update(&notes().set("body", "x")).await.is_err());
        assert!(store.soft_delete_where(&notes()).await.is_err());
        assert!(exec.statements().is_empty());
    }

    #[tokio::test]
    async fn zero_affected_rows_is_not_modified() {
        let exec = Arc::new(Scripted::default().reply(Reply::Affected(0)));
        let err = store(exec)
            .update(&notes().set("body", "x").filter("id", 1i64))
            .await
            .unwrap_err();
        match err {
            DatabaseError::NotModified { operation, table } => {
                assert_eq!(operation, Operation::Update);
                assert_eq!(table, "notes");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn soft_delete_stamps_the_clock_time() {
        let exec = Arc::new(Scripted::default().reply(Reply::Affected(1)));
        store(exec.clone()).soft_delete("notes", 5).await.unwrap();

        let stmt = &exec.statements()[0];
        let at = SqlValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert_eq!(stmt.params, vec![at.clone(), at, SqlValue::Int(5)]);
        assert!(stmt.sql.contains(r#""deleted_at" IS NULL"#));
    }

    #[tokio::test]
    async fn hard_delete_of_missing_row_is_not_modified() {
        let exec = Arc::new(Scripted::default().reply(Reply::Affected(0)));
        let err = store(exec).hard_delete("notes", 9).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotModified { operation: Operation::Delete, .. }));
    }

    #[tokio::test]
    async fn find_maps_first_row_or_reports_not_found() {
        let exec = Arc::new(
            Scripted::default()
                .reply(Reply::Rows(vec![row(&["id", "body", "extra"], vec![
                    SqlValue::Int(1),
                    SqlValue::Text("first".into()),
                    SqlValue::Bool(true),
                ])]))
                .reply(Reply::Rows(Vec::new())),
        );
        let store = store(exec);

        let note: Note = store.find(&notes().filter("id", 1i64)).await.unwrap();
        assert_eq!(note.body, "first");

        let err = store.find::<Note>(&notes().filter("id", 2i64)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_returns_empty_sequence_when_nothing_matches() {
        let exec = Arc::new(Scripted::default());
        let notes: Vec<Note> = store(exec).get(&notes()).await.unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn paginate_page_clamps_then_windows() {
        let exec = Arc::new(
            Scripted::default()
                .reply(Reply::Rows(vec![row(&["count"], vec![SqlValue::Int(47)])]))
                .reply(Reply::Rows(vec![row(&["id"], vec![SqlValue::Int(7)])])),
        );
        let page: Page<Note> = store(exec.clone()).paginate_page(&notes().active_only(), 999, 10).await.unwrap();

        assert_eq!(page.cursor.current, 5);
        assert_eq!(page.items.len(), 1);
        let select = &exec.statements()[1];
        assert_eq!(&select.params[..], &[SqlValue::Int(40), SqlValue::Int(10)]);
    }

    #[tokio::test]
    async fn count_is_stable_for_identical_conditions() {
        let exec = Arc::new(
            Scripted::default()
                .reply(Reply::Rows(vec![row(&["count"], vec![SqlValue::Int(3)])]))
                .reply(Reply::Rows(vec![row(&["count"], vec![SqlValue::Int(3)])])),
        );
        let store = store(exec.clone());
        let q = notes().filter("body", "x");
        assert_eq!(store.count(&q).await.unwrap(), store.count(&q).await.unwrap());
        let stmts = exec.statements();
        assert_eq!(stmts[0], stmts[1]);
    }

    #[tokio::test]
    async fn existence_checks_map_counts_to_domain_errors() {
        let exec = Arc::new(
            Scripted::default()
                .reply(Reply::Rows(vec![row(&["count"], vec![SqlValue::Int(1)])]))
                .reply(Reply::Rows(vec![row(&["count"], vec![SqlValue::Int(0)])])),
        );
        let store = store(exec);
        let q = notes().filter("body", "dup");

        assert!(matches!(
            store.not_exists_in_table(&q).await,
            Err(DatabaseError::AlreadyExists { .. })
        ));
        assert!(matches!(
            store.exists_in_table(&q).await,
            Err(DatabaseError::NotFoundCondition { .. })
        ));
        assert!(store.exists_in_table(&notes()).await.is_err());
    }
}
