#[cfg(test)]
mod tests {
    use lazy_stmt_core::Driver;
    use lazy_stmt_sqlite::SQLiteDriver;
    use lazy_stmt_tests::{execute_tests, init_logs};
    use std::env;

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        let url = env::var("LAZY_STMT_SQLITE_TEST").unwrap_or_else(|_| "sqlite://:memory:".into());
        let driver = SQLiteDriver::new();
        let connection = driver
            .connect(url.clone().into())
            .await
            .unwrap_or_else(|e| panic!("Could not connect to `{url}`: {e:#}"));
        execute_tests(connection).await;
    }
}
