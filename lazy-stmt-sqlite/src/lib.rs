//! SQLite driver for `lazy-stmt`.
mod cbox;
mod connection;
mod driver;
mod extract;
mod prepared;

pub(crate) use cbox::*;
pub use connection::*;
pub use driver::*;
pub use prepared::*;
