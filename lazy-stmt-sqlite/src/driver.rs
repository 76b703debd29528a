use crate::{SQLiteConnection, SQLitePrepared};
use lazy_stmt_core::Driver;

#[derive(Default, Clone, Copy, Debug)]
pub struct SQLiteDriver {}

impl SQLiteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SQLiteDriver {
    type Connection = SQLiteConnection;
    type Prepared = SQLitePrepared;

    const NAME: &'static [&'static str] = &["sqlite"];
}
