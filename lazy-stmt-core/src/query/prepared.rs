use crate::{Arg, AsValue, Error, Result};
use std::fmt::{Debug, Display};

/// A parameterized, backend-prepared query handle.
///
/// `Prepared` enables drivers to pre-parse / optimize SQL statements and later
/// bind parameters. Values are converted via the `AsValue` trait.
///
/// # Binding Semantics
/// * `bind` appends a value (driver chooses actual placeholder numbering).
/// * `bind_index` sets the parameter at `index` (zero-based).
/// * `bind_named` sets the parameter called `name`.
/// * `bind_args` binds a full argument list, replacing the current bindings.
///
/// Methods return `&mut Self` for fluent chaining:
/// ```ignore
/// prepared.bind(42)?.bind("hello")?;
/// ```
pub trait Prepared: Send + Sync + Display + Debug {
    /// Clear all bound values.
    fn clear_bindings(&mut self) -> Result<&mut Self>
    where
        Self: Sized;
    /// Append a bound value.
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self>
    where
        Self: Sized;
    /// Bind a value at a specific index.
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self>
    where
        Self: Sized;
    /// Bind a value to a named parameter.
    fn bind_named(&mut self, name: &str, _value: impl AsValue) -> Result<&mut Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot bind `{name}`: named parameters are not supported by this driver"
        )))
    }
    /// Bind an argument, by name when it has one.
    fn bind_arg(&mut self, arg: Arg) -> Result<&mut Self>
    where
        Self: Sized,
    {
        match arg.name {
            Some(name) => self.bind_named(&name, arg.value),
            None => self.bind(arg.value),
        }
    }
    /// Bind a whole argument list, replacing the current bindings.
    ///
    /// Defaults to `bind_arg` in order. Drivers mixing named and positional parameters override
    /// it so that positional arguments go to the parameters no name claimed.
    fn bind_args(&mut self, args: impl IntoIterator<Item = Arg>) -> Result<&mut Self>
    where
        Self: Sized,
    {
        self.clear_bindings()?;
        for arg in args {
            self.bind_arg(arg)?;
        }
        Ok(self)
    }
}
