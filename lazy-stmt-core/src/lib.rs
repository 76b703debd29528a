mod as_value;
mod connection;
mod context;
mod driver;
mod executor;
mod lazy_statement;
mod query;
mod row;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use connection::*;
pub use context::*;
pub use driver::*;
pub use executor::*;
pub use lazy_statement::*;
pub use query::*;
pub use row::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
pub use ::tokio::sync::Mutex;

/// Result type.
pub type Result<T> = anyhow::Result<T>;
/// Error type.
pub type Error = anyhow::Error;
