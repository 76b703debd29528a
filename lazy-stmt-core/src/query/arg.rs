use crate::{AsValue, Value};
use std::{
    borrow::Cow,
    fmt::{self, Display},
};

/// One argument passed to a query execution.
///
/// Positional arguments are bound in order, named ones by parameter name. How a name maps
/// onto a placeholder (`:name`, `@name`, `$name`, ...) is up to the driver.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    /// Parameter name, `None` for positional arguments.
    pub name: Option<Cow<'static, str>>,
    /// Bound value.
    pub value: Value,
}

impl Arg {
    pub fn positional(value: impl AsValue) -> Self {
        Self {
            name: None,
            value: value.as_value(),
        }
    }
    pub fn named(name: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self {
            name: Some(name.into()),
            value: value.as_value(),
        }
    }
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self { name: None, value }
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} => ")?;
        }
        Display::fmt(&self.value, f)
    }
}

/// Build a list of positional arguments.
///
/// ```
/// use lazy_stmt_core::{Value, params};
/// let args = params![1, "two", 3.0];
/// assert_eq!(args.len(), 3);
/// assert_eq!(args[1].value, Value::Varchar(Some("two".into())));
/// assert!(params![].is_empty());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::positional($value)),+]
    };
}

/// Build a list of named arguments.
///
/// ```
/// use lazy_stmt_core::named_params;
/// let args = named_params![":id" => 7, ":name" => "seven"];
/// assert!(args.iter().all(|v| v.is_named()));
/// ```
#[macro_export]
macro_rules! named_params {
    ($($name:expr => $value:expr),* $(,)?) => {
        ::std::vec![$($crate::Arg::named($name, $value)),*]
    };
}
