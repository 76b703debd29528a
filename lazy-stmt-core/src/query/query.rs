use crate::{Arg, AsValue, Driver, Error, Prepared, Result, RowLabeled, RowsAffected, truncate_long};
use std::fmt::{self, Display};

/// Unprepared SQL text, together with the arguments the driver binds when running it.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct RawQuery {
    pub sql: String,
    pub args: Vec<Arg>,
}

impl RawQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
    pub fn with_args(sql: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        Self {
            sql: sql.into(),
            args: args.into_iter().collect(),
        }
    }
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl Display for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Executable query: raw SQL or prepared statement.
#[derive(Debug)]
pub enum Query<D: Driver> {
    /// Unprepared SQL text.
    Raw(RawQuery),
    /// Driver prepared statement.
    Prepared(D::Prepared),
}

impl<D: Driver> Query<D> {
    /// Create a raw query
    pub fn raw(value: String) -> Self {
        Query::Raw(RawQuery::new(value))
    }
    /// Create a prepared query
    pub fn prepared(value: D::Prepared) -> Self {
        Query::Prepared(value)
    }
    /// Returns `true` when this `Query` contains a backend-prepared statement.
    pub fn is_prepared(&self) -> bool {
        matches!(self, Query::Prepared(..))
    }
    /// Clear all bound values.
    pub fn clear_bindings(&mut self) -> Result<&mut Self> {
        match self {
            Self::Raw(raw) => raw.args.clear(),
            Self::Prepared(prepared) => {
                prepared.clear_bindings()?;
            }
        };
        Ok(self)
    }
    /// Append a bound value.
    pub fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        match self {
            Self::Raw(raw) => raw.args.push(Arg::positional(value)),
            Self::Prepared(prepared) => {
                prepared.bind(value)?;
            }
        };
        Ok(self)
    }
    /// Bind a value at a specific index.
    /// It results in an error if the query is not prepared.
    pub fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        let Self::Prepared(prepared) = self else {
            return Err(Error::msg("Cannot bind index of a raw query"));
        };
        prepared.bind_index(value, index)?;
        Ok(self)
    }
    /// Bind a value to a named parameter.
    pub fn bind_named(
        &mut self,
        name: impl Into<String>,
        value: impl AsValue,
    ) -> Result<&mut Self> {
        let name = name.into();
        match self {
            Self::Raw(raw) => raw.args.push(Arg::named(name, value)),
            Self::Prepared(prepared) => {
                prepared.bind_named(&name, value)?;
            }
        };
        Ok(self)
    }
    /// Bind the full argument list, replacing earlier bindings.
    pub fn bind_args(&mut self, args: impl IntoIterator<Item = Arg>) -> Result<&mut Self> {
        match self {
            Self::Raw(raw) => raw.args = args.into_iter().collect(),
            Self::Prepared(prepared) => {
                prepared.bind_args(args)?;
            }
        };
        Ok(self)
    }
}

impl<D: Driver> Default for Query<D> {
    fn default() -> Self {
        Self::raw(Default::default())
    }
}

impl<D: Driver> From<&str> for Query<D> {
    fn from(value: &str) -> Self {
        Self::raw(value.into())
    }
}

impl<D: Driver> From<String> for Query<D> {
    fn from(value: String) -> Self {
        Self::raw(value)
    }
}

impl<D: Driver> From<RawQuery> for Query<D> {
    fn from(value: RawQuery) -> Self {
        Query::Raw(value)
    }
}

impl<D, P> From<P> for Query<D>
where
    D: Driver<Prepared = P>,
    P: Prepared,
{
    fn from(value: P) -> Self {
        Self::prepared(value)
    }
}

impl<D: Driver> Display for Query<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Raw(v) => Display::fmt(v, f),
            Query::Prepared(query) => Display::fmt(query, f),
        }
    }
}

impl<D: Driver> AsMut<Query<D>> for Query<D> {
    fn as_mut(&mut self) -> &mut Query<D> {
        self
    }
}

/// Items from `Executor::run`: rows or effects.
#[derive(Debug)]
pub enum QueryResult {
    /// A labeled row
    Row(RowLabeled),
    /// A modify effect aggregation
    Affected(RowsAffected),
}
