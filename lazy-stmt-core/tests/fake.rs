use async_stream::try_stream;
use lazy_stmt_core::{
    Arg, AsQuery, AsValue, Connection, Driver, Error, Executor, Prepared, Query, QueryResult,
    RawQuery, Result, RowLabeled, RowNames, RowsAffected, Value, stream::Stream,
};
use std::{
    borrow::Cow,
    fmt::{self, Display},
    mem,
};

/// In memory backend recording what it is asked to do.
#[derive(Default, Clone, Copy, Debug)]
pub struct FakeDriver;

impl Driver for FakeDriver {
    type Connection = FakeConnection;
    type Prepared = FakePrepared;

    const NAME: &'static [&'static str] = &["fake"];
}

#[derive(Debug)]
pub struct FakePrepared {
    pub id: usize,
    pub sql: String,
    pub args: Vec<Arg>,
}

impl Display for FakePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.sql)
    }
}

impl Prepared for FakePrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.args.clear();
        Ok(self)
    }
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        self.args.push(Arg::positional(value));
        Ok(self)
    }
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        let index = index as usize;
        if self.args.len() <= index {
            self.args.resize(index + 1, Arg::from(Value::Null));
        }
        self.args[index] = Arg::positional(value);
        Ok(self)
    }
    fn bind_named(&mut self, name: &str, value: impl AsValue) -> Result<&mut Self> {
        self.args.push(Arg::named(name.to_string(), value));
        Ok(self)
    }
}

/// One statement run by `FakeConnection`.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    /// Id of the prepared statement used, `None` when the text ran unprepared.
    pub prepared: Option<usize>,
    pub sql: String,
    pub args: Vec<Arg>,
}

impl Run {
    fn of(query: &Query<FakeDriver>) -> Self {
        match query {
            Query::Raw(RawQuery { sql, args }) => Run {
                prepared: None,
                sql: sql.clone(),
                args: args.clone(),
            },
            Query::Prepared(prepared) => Run {
                prepared: Some(prepared.id),
                sql: prepared.sql.clone(),
                args: prepared.args.clone(),
            },
        }
    }
}

/// Query moved out of its slot for the duration of a run, put back when dropped.
struct Running<'q> {
    slot: &'q mut Query<FakeDriver>,
    query: Query<FakeDriver>,
}

impl<'q> Running<'q> {
    fn new(slot: &'q mut Query<FakeDriver>) -> Self {
        let query = mem::take(slot);
        Self { slot, query }
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        *self.slot = mem::take(&mut self.query);
    }
}

/// Statements starting with `INVALID` never prepare, `FAIL` ones prepare but fail when run.
/// `SELECT` yields one row per argument, anything else reports one affected row per argument.
#[derive(Default, Debug)]
pub struct FakeConnection {
    pub prepares: usize,
    pub fail_prepare: bool,
    pub runs: Vec<Run>,
}

impl Executor for FakeConnection {
    type Driver = FakeDriver;

    async fn do_prepare(&mut self, sql: String) -> Result<Query<FakeDriver>> {
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        if self.fail_prepare || sql.starts_with("INVALID") {
            return Err(Error::msg(format!("cannot prepare `{sql}`")));
        }
        self.prepares += 1;
        Ok(FakePrepared {
            id: self.prepares,
            sql,
            args: Vec::new(),
        }
        .into())
    }

    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<FakeDriver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let mut query = query.as_query();
        let runs = &mut self.runs;
        try_stream! {
            // Owned by the run like a statement lent to a worker, it goes back on every exit
            let running = Running::new(query.as_mut());
            let run = Run::of(&running.query);
            runs.push(run.clone());
            if run.sql.starts_with("INVALID") || run.sql.starts_with("FAIL") {
                Err::<(), _>(Error::msg("execution failed"))?;
            }
            if run.sql.starts_with("SELECT") {
                let labels: RowNames = vec!["value".to_string()].into();
                for arg in run.args {
                    yield QueryResult::Row(RowLabeled::new(
                        labels.clone(),
                        vec![arg.value].into(),
                    ));
                }
            } else {
                yield QueryResult::Affected(RowsAffected {
                    rows_affected: Some(run.args.len() as _),
                    last_affected_id: None,
                });
            }
        }
    }
}

impl Connection for FakeConnection {
    async fn connect(url: Cow<'static, str>) -> Result<FakeConnection> {
        Self::sanitize_url(url)?;
        Ok(Default::default())
    }
}
