use crate::{
    AsQuery, Context, Driver, Query, QueryResult, RawQuery, Result, RowLabeled, RowsAffected,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::{future::Future, mem, pin::pin};

/// Async query executor bound to a concrete `Driver`.
///
/// Responsibilities:
/// - Prepare SQL into backend statements
/// - Stream results without buffering (when possible)
/// - Provide ergonomic helpers for fetching and execution, optionally bounded by a `Context`
///
/// Implementors typically wrap a connection handle.
pub trait Executor: Send + Sized {
    /// Associated driver type.
    type Driver: Driver;

    /// Returns a driver instance.
    ///
    /// Override if the executor carries specific driver state.
    fn driver(&self) -> Self::Driver {
        Default::default()
    }

    /// Prepare a query for later execution.
    fn prepare<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<Query<Self::Driver>>> + Send {
        let mut query = query.as_query();
        let query = mem::take(query.as_mut());
        async move {
            match query {
                Query::Raw(RawQuery { sql, .. }) => self.do_prepare(sql).await,
                Query::Prepared(..) => Ok(query),
            }
        }
    }

    /// Actual implementation for `prepare`.
    fn do_prepare(
        &mut self,
        sql: String,
    ) -> impl Future<Output = Result<Query<Self::Driver>>> + Send;

    /// Execute a query, streaming `QueryResult` (rows or affected counts).
    ///
    /// A prepared query stays usable afterwards, also when the stream fails or is dropped early.
    /// Drivers that move the statement to a worker must put it back on every path.
    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute a query yielding `RowLabeled` from the resulting stream (filtering out `RowsAffected`).
    fn fetch<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(query).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute a query expected to return at most one row, yielding the first one.
    ///
    /// The remaining rows, if any, are consumed and discarded.
    fn fetch_one<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        let stream = self.fetch(query);
        async move {
            let mut stream = pin!(stream);
            let row = stream.try_next().await?;
            while stream.try_next().await?.is_some() {}
            Ok(row)
        }
    }

    /// Execute and aggregate affected rows counter.
    fn execute<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// `run` bounded by `context`.
    fn run_with_context<'s>(
        &'s mut self,
        context: &Context,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        context.guard_stream(self.run(query))
    }

    /// `fetch` bounded by `context`.
    fn fetch_with_context<'s>(
        &'s mut self,
        context: &Context,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        context.guard_stream(self.fetch(query))
    }

    /// `fetch_one` bounded by `context`.
    fn fetch_one_with_context<'s>(
        &'s mut self,
        context: &Context,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        let context = context.clone();
        let future = self.fetch_one(query);
        async move { context.run(future).await }
    }

    /// `execute` bounded by `context`.
    fn execute_with_context<'s>(
        &'s mut self,
        context: &Context,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let context = context.clone();
        let future = self.execute(query);
        async move { context.run(future).await }
    }
}
