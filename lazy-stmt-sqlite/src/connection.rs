use crate::{
    CBox, SQLiteDriver, SQLitePrepared,
    extract::{extract_name, extract_value, parameter_name},
    prepared::{PendingArgs, bind_values},
};
use async_stream::try_stream;
use flume::Sender;
use lazy_stmt_core::{
    AsQuery, Connection, Error, ErrorContext, Executor, Query, QueryResult, RawQuery, Result,
    RowLabeled, RowsAffected, Value, error_message_from_ptr, send_value, stream::Stream,
    truncate_long,
};
use libsqlite3_sys::*;
use std::{
    borrow::Cow,
    ffi::{CStr, CString, c_char, c_int},
    ptr,
    str::FromStr,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicPtr, Ordering},
    },
};
use tokio::task::spawn_blocking;

/// Wrapper for a SQLite `sqlite3` connection pointer.
///
/// Prepares statements and streams their results into `lazy_stmt_core` result types.
pub struct SQLiteConnection {
    pub(crate) connection: CBox<sqlite3>,
}

fn finalize_statement(statement: *mut sqlite3_stmt) {
    unsafe {
        let db = sqlite3_db_handle(statement);
        if sqlite3_finalize(statement) != SQLITE_OK {
            let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string())
                .context("While finalizing a prepared statement");
            log::error!("{error:#}");
        }
    }
}

impl SQLiteConnection {
    /// Bind `values` and step `statement` to completion sending the results into `tx`.
    ///
    /// Returns `false` if an error was sent or the receiver went away.
    pub(crate) fn do_run_prepared(
        connection: *mut sqlite3,
        statement: *mut sqlite3_stmt,
        values: &[Value],
        tx: &Sender<Result<QueryResult>>,
    ) -> bool {
        unsafe {
            // A previous run might have been interrupted
            sqlite3_reset(statement);
            if let Err(error) = bind_values(statement, values) {
                send_value!(tx, Err(error));
                return false;
            }
            let count = sqlite3_column_count(statement);
            let labels = match (0..count)
                .map(|i| extract_name(statement, i))
                .collect::<Result<Arc<[_]>>>()
            {
                Ok(labels) => labels,
                Err(error) => {
                    send_value!(tx, Err(error));
                    return false;
                }
            };
            let completed = loop {
                if tx.is_disconnected() {
                    break false;
                }
                match sqlite3_step(statement) {
                    SQLITE_BUSY => {
                        continue;
                    }
                    SQLITE_DONE => {
                        if sqlite3_stmt_readonly(statement) == 0 {
                            send_value!(
                                tx,
                                Ok(QueryResult::Affected(RowsAffected {
                                    rows_affected: Some(sqlite3_changes64(connection) as _),
                                    last_affected_id: Some(sqlite3_last_insert_rowid(connection)),
                                }))
                            );
                        }
                        break true;
                    }
                    SQLITE_ROW => {
                        let values = match (0..count)
                            .map(|i| extract_value(statement, i))
                            .collect::<Result<_>>()
                        {
                            Ok(values) => values,
                            Err(error) => {
                                send_value!(tx, Err(error));
                                break false;
                            }
                        };
                        send_value!(
                            tx,
                            Ok(QueryResult::Row(RowLabeled::new(labels.clone(), values)))
                        )
                    }
                    _ => {
                        send_value!(
                            tx,
                            Err(Error::msg(
                                error_message_from_ptr(&sqlite3_errmsg(connection)).to_string(),
                            ))
                        );
                        break false;
                    }
                }
            };
            sqlite3_reset(statement);
            sqlite3_clear_bindings(statement);
            completed
        }
    }

    /// Prepare and run each statement of `query` in turn.
    pub(crate) fn do_run_unprepared(
        connection: *mut sqlite3,
        query: &RawQuery,
        tx: &Sender<Result<QueryResult>>,
    ) {
        let mut args = match PendingArgs::new(query.args.clone()) {
            Ok(args) => args,
            Err(error) => {
                send_value!(tx, Err(error));
                return;
            }
        };
        let sql = query.sql.trim();
        let mut it = sql.as_ptr() as *const c_char;
        let mut len = sql.len();
        let mut ran = false;
        unsafe {
            while len > 0 {
                let mut statement = CBox::null(finalize_statement);
                let mut tail = ptr::null();
                let rc =
                    sqlite3_prepare_v2(connection, it, len as c_int, &mut *statement, &mut tail);
                if rc != SQLITE_OK {
                    send_value!(
                        tx,
                        Err(Error::msg(
                            error_message_from_ptr(&sqlite3_errmsg(connection)).to_string(),
                        ))
                    );
                    return;
                }
                len = if !tail.is_null() {
                    len - tail.offset_from_unsigned(it)
                } else {
                    0
                };
                it = tail;
                if statement.is_null() {
                    // Whitespace or comment
                    continue;
                }
                let parameters: Vec<_> = (1..=sqlite3_bind_parameter_count(*statement))
                    .map(|i| parameter_name(*statement, i))
                    .collect();
                let values = args.take(&parameters);
                if len == 0
                    && let Err(error) = args.check_consumed()
                {
                    send_value!(tx, Err(error));
                    return;
                }
                if !Self::do_run_prepared(connection, *statement, &values, tx) {
                    return;
                }
                ran = true;
            }
        }
        if !ran && let Err(error) = args.check_consumed() {
            send_value!(tx, Err(error));
        }
    }
}

impl Executor for SQLiteConnection {
    type Driver = SQLiteDriver;

    async fn do_prepare(&mut self, sql: String) -> Result<Query<Self::Driver>> {
        let connection = AtomicPtr::new(*self.connection);
        let context = format!("While preparing the query:\n{}", truncate_long!(sql));
        let prepared = spawn_blocking(move || unsafe {
            let connection = connection.load(Ordering::Relaxed);
            let sql = CString::new(sql.into_bytes())?;
            let mut statement = CBox::null(finalize_statement);
            let mut tail = ptr::null();
            let rc = sqlite3_prepare_v2(connection, sql.as_ptr(), -1, &mut *statement, &mut tail);
            if rc != SQLITE_OK {
                let error =
                    Error::msg(error_message_from_ptr(&sqlite3_errmsg(connection)).to_string())
                        .context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            if statement.is_null() {
                let error = Error::msg("The query does not contain any statement").context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
            if !tail.is_null() {
                let remaining = CStr::from_ptr(tail).to_string_lossy();
                if !remaining.trim().is_empty() {
                    let error = Error::msg(format!(
                        "Cannot prepare more than one statement at a time (remaining: {})",
                        truncate_long!(remaining)
                    ))
                    .context(context);
                    log::error!("{:#}", error);
                    return Err(error);
                }
            }
            Ok(SQLitePrepared::new(statement))
        })
        .await?;
        Ok(prepared?.into())
    }

    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let mut query = query.as_query();
        let connection = AtomicPtr::new(*self.connection);
        // Nothing runs until the stream is first polled
        try_stream! {
            let query = query.as_mut();
            let context = Arc::new(format!("While running the query:\n{query}"));
            let (tx, rx) = flume::unbounded::<Result<QueryResult>>();
            // The statement stays in `query`, the task only shares its handle
            let work = match query {
                Query::Raw(raw) => Work::Unprepared(raw.clone()),
                Query::Prepared(prepared) => {
                    Work::Prepared(prepared.statement.clone(), prepared.take_values())
                }
            };
            let join = spawn_blocking(move || {
                let connection = connection.load(Ordering::Relaxed);
                match work {
                    Work::Unprepared(raw) => Self::do_run_unprepared(connection, &raw, &tx),
                    Work::Prepared(statement, values) => {
                        let statement = statement.lock().unwrap_or_else(PoisonError::into_inner);
                        Self::do_run_prepared(connection, **statement, &values, &tx);
                    }
                }
            });
            while let Ok(result) = rx.recv_async().await {
                yield result.map_err(|e| {
                    let error = e.context(context.clone());
                    log::error!("{:#}", error);
                    error
                })?;
            }
            join.await?;
        }
    }
}

/// What a blocking run task receives.
enum Work {
    Unprepared(RawQuery),
    Prepared(Arc<Mutex<CBox<sqlite3_stmt>>>, Vec<Value>),
}

impl Connection for SQLiteConnection {
    async fn connect(url: Cow<'static, str>) -> Result<SQLiteConnection> {
        let context = format!("While trying to connect to `{}`", truncate_long!(url));
        let url = Self::sanitize_url(url)?;
        let url = CString::from_str(&url.as_str().replacen("sqlite://", "file:", 1))
            .with_context(|| context.clone())?;
        let mut connection = CBox::<sqlite3>::null(|p| unsafe {
            // Deferred until statements still shared with a run are finalized
            if sqlite3_close_v2(p) != SQLITE_OK {
                let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(p)).to_string())
                    .context("While closing the sqlite connection");
                log::error!("{error:#}");
            }
        });
        unsafe {
            let rc = sqlite3_open_v2(
                url.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                let error =
                    Error::msg(error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string())
                        .context(context);
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        Ok(Self { connection })
    }
}
