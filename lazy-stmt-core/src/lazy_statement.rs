use crate::{
    Arg, Context, Driver, Executor, Query, RawQuery, Result, RowLabeled, RowsAffected,
    future::FutureExt,
    stream::{Stream, TryStreamExt},
    truncate_long,
};
use async_stream::try_stream;
use std::{
    fmt::{self, Debug, Display},
    sync::Arc,
};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

/// Prepared statement realized on first use.
///
/// Holds a shared handle to an `Executor`, the SQL text and, once preparation succeeded, the
/// prepared statement. Every call that finds no prepared statement tries to prepare it again;
/// when that fails the SQL runs unprepared on the same executor with the same arguments, so
/// callers observe the same rows, counters and errors either way.
///
/// Preparation errors never reach the caller. Execution errors are returned unchanged.
///
/// The executor is locked for one execution at a time. Rows of `query` are read in full before
/// the stream yields them, so other statements sharing the executor can run while iterating.
///
/// ```ignore
/// let connection = Arc::new(Mutex::new(driver.connect("sqlite://:memory:".into()).await?));
/// let insert = LazyStatement::prepare(connection.clone(), "INSERT INTO t VALUES (?)").await;
/// insert.execute(params![1]).await?;
/// insert.execute(params![2]).await?;
/// ```
pub struct LazyStatement<E: Executor> {
    // Dropped before the executor
    prepared: Mutex<Option<Query<E::Driver>>>,
    executor: Arc<Mutex<E>>,
    sql: String,
}

/// Query selected for one execution.
enum Statement<'s, D: Driver> {
    Prepared(MappedMutexGuard<'s, Query<D>>),
    Unprepared(Query<D>),
}

impl<'s, D: Driver> Statement<'s, D> {
    fn query(&mut self) -> &mut Query<D> {
        match self {
            Statement::Prepared(query) => &mut **query,
            Statement::Unprepared(query) => query,
        }
    }
}

impl<E: Executor> LazyStatement<E> {
    /// Create the statement and try to prepare it right away.
    ///
    /// Never fails: if the preparation does not succeed it is attempted again on the next call.
    pub async fn prepare(executor: Arc<Mutex<E>>, sql: impl Into<String>) -> Self {
        let result = Self::deferred(executor, sql);
        let _ = result.resolve().await;
        result
    }

    /// Create the statement without touching the executor.
    pub fn deferred(executor: Arc<Mutex<E>>, sql: impl Into<String>) -> Self {
        Self {
            prepared: Mutex::new(None),
            executor,
            sql: sql.into(),
        }
    }

    /// The prepared statement, preparing it if needed.
    ///
    /// Returns `None` when the preparation fails. The guard keeps the statement locked:
    /// drop it before executing through this `LazyStatement`.
    pub async fn resolve(&self) -> Option<MappedMutexGuard<'_, Query<E::Driver>>> {
        let mut slot = self.prepared.lock().await;
        // Drivers hand the statement back after every run, a raw query here counts as missing
        if !slot.as_ref().is_some_and(|v| v.is_prepared()) {
            *slot = self.try_prepare().await;
        }
        MutexGuard::try_map(slot, |v| v.as_mut()).ok()
    }

    /// Whether a prepared statement is currently cached. Does not attempt preparation.
    pub async fn is_prepared(&self) -> bool {
        self.prepared
            .lock()
            .await
            .as_ref()
            .is_some_and(|v| v.is_prepared())
    }

    /// The SQL text this statement was created with.
    pub fn raw(&self) -> &str {
        &self.sql
    }

    /// Shared handle to the executor.
    pub fn executor(&self) -> &Arc<Mutex<E>> {
        &self.executor
    }

    /// Execute with `args`, returning the aggregated affected rows.
    pub async fn execute(&self, args: impl IntoIterator<Item = Arg>) -> Result<RowsAffected> {
        let mut statement = self.statement(args.into_iter().collect()).await?;
        let mut executor = self.executor.lock().await;
        executor.execute(statement.query()).boxed().await
    }

    /// `execute` bounded by `context`.
    pub async fn execute_with_context(
        &self,
        context: &Context,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<RowsAffected> {
        let mut statement = self.statement(args.into_iter().collect()).await?;
        let mut executor = self.executor.lock().await;
        executor
            .execute_with_context(context, statement.query())
            .boxed()
            .await
    }

    /// Run with `args`, streaming the resulting rows.
    ///
    /// The rows are collected before the first one is yielded and the executor is released by then:
    /// running other statements on it from inside the loop is fine.
    pub fn query(
        &self,
        args: impl IntoIterator<Item = Arg>,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        let args: Vec<Arg> = args.into_iter().collect();
        try_stream! {
            for row in self.fetch_all(None, args).await? {
                yield row;
            }
        }
    }

    /// `query` bounded by `context`.
    ///
    /// The context covers reading the rows, not the iteration that follows.
    pub fn query_with_context(
        &self,
        context: &Context,
        args: impl IntoIterator<Item = Arg>,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        let args: Vec<Arg> = args.into_iter().collect();
        let context = context.clone();
        try_stream! {
            for row in self.fetch_all(Some(&context), args).await? {
                yield row;
            }
        }
    }

    /// Run with `args`, returning the first row (if any).
    pub async fn query_row(&self, args: impl IntoIterator<Item = Arg>) -> Result<Option<RowLabeled>> {
        let mut statement = self.statement(args.into_iter().collect()).await?;
        let mut executor = self.executor.lock().await;
        executor.fetch_one(statement.query()).boxed().await
    }

    /// `query_row` bounded by `context`.
    pub async fn query_row_with_context(
        &self,
        context: &Context,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Option<RowLabeled>> {
        let mut statement = self.statement(args.into_iter().collect()).await?;
        let mut executor = self.executor.lock().await;
        executor
            .fetch_one_with_context(context, statement.query())
            .boxed()
            .await
    }

    async fn fetch_all(&self, context: Option<&Context>, args: Vec<Arg>) -> Result<Vec<RowLabeled>> {
        let mut statement = self.statement(args).await?;
        let mut executor = self.executor.lock().await;
        let query = statement.query();
        match context {
            Some(context) => {
                executor
                    .fetch_with_context(context, query)
                    .try_collect()
                    .boxed()
                    .await
            }
            None => executor.fetch(query).try_collect().boxed().await,
        }
    }

    async fn try_prepare(&self) -> Option<Query<E::Driver>> {
        let mut executor = self.executor.lock().await;
        match executor.prepare(self.sql.clone()).boxed().await {
            Ok(query) if query.is_prepared() => {
                log::trace!("Prepared statement `{}`", truncate_long!(self.sql));
                Some(query)
            }
            Ok(..) => {
                log::debug!(
                    "The driver returned an unprepared query for `{}`, it will run unprepared",
                    truncate_long!(self.sql)
                );
                None
            }
            Err(error) => {
                log::debug!(
                    "Could not prepare `{}`, it will run unprepared: {error:#}",
                    truncate_long!(self.sql)
                );
                None
            }
        }
    }

    /// Pick the prepared statement when available, the raw SQL otherwise, and bind `args` to it.
    async fn statement(&self, args: Vec<Arg>) -> Result<Statement<'_, E::Driver>> {
        Ok(match self.resolve().await {
            Some(mut prepared) => {
                prepared.bind_args(args)?;
                Statement::Prepared(prepared)
            }
            None => Statement::Unprepared(Query::Raw(RawQuery::with_args(self.sql.clone(), args))),
        })
    }
}

impl<E: Executor> Debug for LazyStatement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyStatement")
            .field("sql", &self.sql)
            .field(
                "prepared",
                &self
                    .prepared
                    .try_lock()
                    .ok()
                    .map(|v| v.as_ref().is_some_and(|v| v.is_prepared())),
            )
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Display for LazyStatement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}
