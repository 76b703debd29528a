//! Lazily prepared statements.
//!
//! A [`LazyStatement`] wraps a shared database handle and a SQL string. The statement is prepared
//! on first use (or right away with [`LazyStatement::prepare`]); when preparation fails the SQL
//! runs directly on the handle with the same arguments, and the next call tries to prepare again.
//!
//! Drivers implement [`Driver`], [`Connection`], [`Executor`] and [`Prepared`].
pub use lazy_stmt_core::*;
