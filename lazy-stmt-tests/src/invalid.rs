use crate::silent_logs;
use lazy_stmt::{Executor, LazyStatement, Mutex, params, stream::StreamExt};
use std::{pin::pin, sync::Arc};

pub async fn invalid_query<E: Executor>(executor: &Arc<Mutex<E>>) {
    silent_logs! {
        let statement = LazyStatement::prepare(executor.clone(), "SELEC 1").await;
        assert!(statement.resolve().await.is_none());
        assert!(!statement.is_prepared().await);

        {
            let mut rows = pin!(statement.query(params![]));
            let error = rows
                .next()
                .await
                .expect("The stream should report the error")
                .expect_err("A syntax error must reach the caller");
            assert!(
                format!("{error:#}").to_lowercase().contains("syntax"),
                "Unexpected error: {error:#}"
            );
        }
        assert!(statement.execute(params![]).await.is_err());
        assert!(statement.query_row(params![]).await.is_err());
        assert_eq!(statement.raw(), "SELEC 1");
    }
}
