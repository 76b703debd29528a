mod contexts;
mod equivalence;
mod insert;
mod invalid;
mod late_table;
mod multiple;
mod named;
mod nested;
mod query_row;
mod simple;

pub use contexts::*;
pub use equivalence::*;
pub use insert::*;
pub use invalid::*;
use lazy_stmt::{Connection, Executor, LazyStatement, Mutex};
pub use late_table::*;
use log::LevelFilter;
pub use multiple::*;
pub use named::*;
pub use nested::*;
pub use query_row::*;
pub use simple::*;
use std::{env, sync::Arc};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Unique table name, tests can share a database.
pub fn table_name(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Debug rendering of the cached statement, which shows the driver handle.
pub async fn prepared_handle<E: Executor>(statement: &LazyStatement<E>) -> Option<String> {
    statement.resolve().await.map(|v| format!("{:?}", *v))
}

pub async fn execute_tests<C: Connection>(connection: C) {
    let connection = Arc::new(Mutex::new(connection));
    macro_rules! do_test {
        ($test_function:ident) => {
            Box::pin($test_function(&connection)).await
        };
    }
    do_test!(select_one);
    do_test!(invalid_query);
    do_test!(insert_twice);
    do_test!(late_table);
    do_test!(equivalence);
    #[cfg(not(feature = "disable-named-params"))]
    do_test!(named_params);
    do_test!(query_row);
    do_test!(nested_statements);
    do_test!(contexts);
    #[cfg(not(feature = "disable-multiple-statements"))]
    do_test!(multiple);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
