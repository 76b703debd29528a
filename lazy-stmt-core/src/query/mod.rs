mod arg;
mod as_query;
mod prepared;
mod query;

pub use arg::*;
pub use as_query::*;
pub use prepared::*;
pub use query::*;
