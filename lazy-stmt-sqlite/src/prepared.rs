use crate::{
    CBox,
    extract::{parameter_name, statement_sql},
};
use lazy_stmt_core::{
    Arg, AsValue, Error, Prepared, Result, Value, error_message_from_ptr, truncate_long,
};
use libsqlite3_sys::*;
use rust_decimal::prelude::ToPrimitive;
use std::{
    borrow::Cow,
    collections::VecDeque,
    ffi::{c_char, c_int, c_void},
    fmt::{self, Debug, Display},
    mem,
    sync::{Arc, Mutex},
};

/// Prepared `sqlite3_stmt`, finalized once the last handle is gone.
///
/// Bound values are kept here and applied by the blocking task that runs the statement. That task
/// borrows the handle under its lock, so the statement never leaves this value and a new run waits
/// for an interrupted one to let go of it.
pub struct SQLitePrepared {
    pub(crate) statement: Arc<Mutex<CBox<sqlite3_stmt>>>,
    sql: String,
    /// Parameter names by position, `None` for anonymous ones.
    parameters: Box<[Option<String>]>,
    values: Vec<Value>,
    /// Zero-based index used by the next `bind`.
    index: u64,
}

impl SQLitePrepared {
    /// Wrap a freshly prepared, non null `statement`.
    pub(crate) fn new(statement: CBox<sqlite3_stmt>) -> Self {
        let count = unsafe { sqlite3_bind_parameter_count(*statement) };
        let parameters: Box<[_]> = (1..=count)
            .map(|i| parameter_name(*statement, i))
            .collect();
        Self {
            sql: statement_sql(*statement),
            values: vec![Value::Null; parameters.len()],
            parameters,
            statement: Arc::new(Mutex::new(statement)),
            index: 0,
        }
    }
    /// Number of SQL parameters, named ones included.
    pub fn parameter_count(&self) -> u64 {
        self.parameters.len() as _
    }
    pub fn sql(&self) -> &str {
        &self.sql
    }
    /// Zero-based position of the parameter called `name`, the `:`, `@` or `$` prefix is optional.
    pub(crate) fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|v| v.as_deref().is_some_and(|v| matches_name(v, name)))
    }
    /// Hand the bound values over to a run, leaving every parameter unbound.
    pub(crate) fn take_values(&mut self) -> Vec<Value> {
        self.index = 0;
        mem::replace(&mut self.values, vec![Value::Null; self.parameters.len()])
    }
    fn binding_error(&self, message: String) -> Error {
        let error = Error::msg(message).context(format!(
            "While binding query:\n{}",
            truncate_long!(self.sql)
        ));
        log::error!("{:#}", error);
        error
    }
}

/// Whether the SQL parameter `parameter` (prefix included) is the one called `name`.
pub(crate) fn matches_name(parameter: &str, name: &str) -> bool {
    parameter == name
        || (!name.starts_with([':', '@', '$', '?']) && parameter.get(1..) == Some(name))
}

/// Value in the form `bind_values` writes it.
pub(crate) fn storable(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Decimal(Some(v)) => Value::Float64(Some(v.to_f64().ok_or_else(|| {
            Error::msg(format!("Cannot convert the Decimal value `{v}` to f64"))
        })?)),
        v => v,
    })
}

/// Bind `values` to the parameters of `statement`, in order.
///
/// Runs on the thread owning the statement, the values come from `storable`.
pub(crate) unsafe fn bind_values(statement: *mut sqlite3_stmt, values: &[Value]) -> Result<()> {
    unsafe {
        sqlite3_clear_bindings(statement);
        for (i, value) in values.iter().enumerate() {
            let index = i as c_int + 1;
            let rc = match value {
                Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
                Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
                Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
                Value::Varchar(Some(v)) => bind_text(statement, index, v),
                Value::Blob(Some(v)) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                Value::Date(Some(v)) => bind_text(statement, index, &v.to_string()),
                Value::Time(Some(v)) => bind_text(statement, index, &v.to_string()),
                Value::Timestamp(Some(v)) => bind_text(statement, index, &v.to_string()),
                Value::Uuid(Some(v)) => bind_text(statement, index, &v.to_string()),
                _ => sqlite3_bind_null(statement, index),
            };
            if rc != SQLITE_OK {
                let db = sqlite3_db_handle(statement);
                let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string())
                    .context(format!("Cannot bind parameter {index}"));
                log::error!("{:#}", error);
                return Err(error);
            }
        }
    }
    Ok(())
}

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, value: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            value.as_ptr() as *const c_char,
            value.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

/// Arguments matched against the parameters of one or more statements.
///
/// A named parameter takes the argument with the same name, any other parameter takes the next
/// positional argument. Prepared and unprepared queries bind through this same rule.
pub(crate) struct PendingArgs {
    positional: VecDeque<Value>,
    named: Vec<(Cow<'static, str>, Value, bool)>,
}

impl PendingArgs {
    pub(crate) fn new(args: impl IntoIterator<Item = Arg>) -> Result<Self> {
        let mut result = Self {
            positional: VecDeque::new(),
            named: Vec::new(),
        };
        for arg in args {
            let value = storable(arg.value)?;
            match arg.name {
                Some(name) => result.named.push((name, value, false)),
                None => result.positional.push_back(value),
            }
        }
        Ok(result)
    }

    /// Values for `parameters`, unmatched ones are null.
    pub(crate) fn take(&mut self, parameters: &[Option<String>]) -> Vec<Value> {
        parameters
            .iter()
            .map(|parameter| {
                let found = parameter.as_deref().and_then(|parameter| {
                    self.named
                        .iter_mut()
                        .find(|(name, ..)| matches_name(parameter, name))
                });
                match found {
                    Some((_, value, used)) => {
                        *used = true;
                        value.clone()
                    }
                    None => self.positional.pop_front().unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Error out for arguments no parameter received.
    pub(crate) fn check_consumed(&self) -> Result<()> {
        if !self.positional.is_empty() {
            return Err(Error::msg(format!(
                "Too many arguments: {} positional argument(s) left unbound",
                self.positional.len()
            )));
        }
        if let Some((name, ..)) = self.named.iter().find(|(.., used)| !used) {
            return Err(Error::msg(format!(
                "The query has no parameter named `{name}`"
            )));
        }
        Ok(())
    }
}

impl Prepared for SQLitePrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.values.fill(Value::Null);
        self.index = 0;
        Ok(self)
    }
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        self.bind_index(value, self.index)
    }
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        let count = self.parameter_count();
        if index >= count {
            return Err(self.binding_error(format!(
                "Cannot bind parameter {}, the query has {count}",
                index + 1
            )));
        }
        self.values[index as usize] = storable(value.as_value())?;
        self.index = index + 1;
        Ok(self)
    }
    fn bind_named(&mut self, name: &str, value: impl AsValue) -> Result<&mut Self> {
        let Some(index) = self.parameter_index(name) else {
            return Err(self.binding_error(format!("The query has no parameter named `{name}`")));
        };
        self.values[index] = storable(value.as_value())?;
        Ok(self)
    }
    fn bind_args(&mut self, args: impl IntoIterator<Item = Arg>) -> Result<&mut Self> {
        let mut pending = PendingArgs::new(args)?;
        let values = pending.take(&self.parameters);
        if let Err(error) = pending.check_consumed() {
            return Err(self.binding_error(format!("{error:#}")));
        }
        self.values = values;
        self.index = self.parameters.len() as _;
        Ok(self)
    }
}

impl Display for SQLitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

impl Debug for SQLitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SQLitePrepared")
            .field("statement", &Arc::as_ptr(&self.statement))
            .field("sql", &self.sql)
            .field("index", &self.index)
            .finish()
    }
}
