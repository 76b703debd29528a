mod fake;

#[cfg(test)]
mod tests {
    use crate::fake::{FakeConnection, FakeDriver, Run};
    use futures::future::join_all;
    use lazy_stmt_core::{
        Context, ContextError, Driver, LazyStatement, Mutex, Query, RowsAffected, Value,
        named_params, params,
        stream::{StreamExt, TryStreamExt},
    };
    use std::{pin::pin, sync::Arc, time::Duration};
    use tokio::time::timeout;

    async fn connect() -> Arc<Mutex<FakeConnection>> {
        let connection = FakeDriver
            .connect("fake://localhost".into())
            .await
            .expect("Could not connect");
        Arc::new(Mutex::new(connection))
    }

    async fn prepared_id(statement: &LazyStatement<FakeConnection>) -> Option<usize> {
        statement.resolve().await.map(|v| match &*v {
            Query::Prepared(prepared) => prepared.id,
            Query::Raw(..) => panic!("Resolved to a raw query"),
        })
    }

    #[tokio::test]
    async fn prepares_once_and_reuses() {
        let connection = connect().await;
        let statement = LazyStatement::prepare(connection.clone(), "SELECT ?").await;
        assert!(statement.is_prepared().await);
        assert_eq!(connection.lock().await.prepares, 1);

        let first = prepared_id(&statement).await;
        let second = prepared_id(&statement).await;
        assert_eq!(first, Some(1));
        assert_eq!(first, second);

        for i in 0..3 {
            let row = statement
                .query_row(params![i])
                .await
                .expect("Query failed")
                .expect("No row returned");
            assert_eq!(row.get::<i32>(0).expect("Not an integer"), i);
        }
        let connection = connection.lock().await;
        assert_eq!(connection.prepares, 1);
        assert_eq!(connection.runs.len(), 3);
        assert!(connection.runs.iter().all(|v| v.prepared == Some(1)));
        assert_eq!(connection.runs[2].args, params![2]);
    }

    #[tokio::test]
    async fn deferred_does_not_touch_the_executor() {
        let connection = connect().await;
        let statement = LazyStatement::deferred(connection.clone(), "SELECT ?");
        assert!(!statement.is_prepared().await);
        assert_eq!(connection.lock().await.prepares, 0);
        assert_eq!(prepared_id(&statement).await, Some(1));
        assert!(statement.is_prepared().await);
    }

    #[tokio::test]
    async fn falls_back_and_retries() {
        let connection = connect().await;
        connection.lock().await.fail_prepare = true;
        let statement = LazyStatement::prepare(connection.clone(), "INSERT INTO t VALUES (?)").await;
        assert!(!statement.is_prepared().await);
        assert!(statement.resolve().await.is_none());

        let affected = statement
            .execute(params![10])
            .await
            .expect("Unprepared execution failed");
        assert_eq!(
            affected,
            RowsAffected {
                rows_affected: Some(1),
                last_affected_id: None,
            }
        );
        assert_eq!(
            connection.lock().await.runs.last(),
            Some(&Run {
                prepared: None,
                sql: "INSERT INTO t VALUES (?)".into(),
                args: params![10],
            })
        );

        // Backend recovers: the next call prepares and the one after reuses
        connection.lock().await.fail_prepare = false;
        statement.execute(params![11]).await.expect("Execution failed");
        statement.execute(params![12]).await.expect("Execution failed");
        assert!(statement.is_prepared().await);
        let connection = connection.lock().await;
        assert_eq!(connection.prepares, 1);
        let used: Vec<_> = connection.runs.iter().map(|v| v.prepared).collect();
        assert_eq!(used, [None, Some(1), Some(1)]);
    }

    #[tokio::test]
    async fn unprepared_receives_the_same_arguments() {
        let connection = connect().await;
        let args = named_params![":name" => "alpha", ":id" => 3];
        let good = LazyStatement::prepare(connection.clone(), "UPDATE t SET name = :name").await;
        good.execute(args.clone()).await.expect("Execution failed");

        connection.lock().await.fail_prepare = true;
        let bad = LazyStatement::prepare(connection.clone(), "UPDATE t SET name = :name").await;
        bad.execute(args.clone()).await.expect("Execution failed");

        let connection = connection.lock().await;
        assert_eq!(connection.runs[0].prepared, Some(1));
        assert_eq!(connection.runs[1].prepared, None);
        assert_eq!(connection.runs[0].args, connection.runs[1].args);
        assert_eq!(connection.runs[1].args, args);
    }

    #[tokio::test]
    async fn bindings_do_not_leak_between_calls() {
        let connection = connect().await;
        let statement = LazyStatement::prepare(connection.clone(), "SELECT ?").await;
        let rows: Vec<_> = statement
            .query(params![1, 2, 3])
            .try_collect()
            .await
            .expect("Query failed");
        assert_eq!(rows.len(), 3);
        let rows: Vec<_> = statement
            .query(params![4])
            .try_collect()
            .await
            .expect("Query failed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values(), [Value::Int64(Some(4))]);
        let none = statement.query_row(params![]).await.expect("Query failed");
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn execution_errors_are_returned() {
        let connection = connect().await;
        let failing = LazyStatement::prepare(connection.clone(), "FAIL").await;
        assert!(failing.is_prepared().await);
        let error = failing.execute(params![]).await.expect_err("Should fail");
        assert_eq!(error.to_string(), "execution failed");
        assert!(failing.is_prepared().await);

        let invalid = LazyStatement::prepare(connection.clone(), "INVALID").await;
        assert!(!invalid.is_prepared().await);
        let error = invalid.execute(params![]).await.expect_err("Should fail");
        assert_eq!(error.to_string(), "execution failed");

        let mut stream = pin!(invalid.query(params![]));
        assert!(stream.next().await.expect("Expected an item").is_err());
    }

    #[tokio::test]
    async fn failed_runs_keep_the_statement() {
        let connection = connect().await;
        let failing = LazyStatement::prepare(connection.clone(), "FAIL ?").await;
        assert_eq!(prepared_id(&failing).await, Some(1));
        for i in 0..3 {
            failing.execute(params![i]).await.expect_err("Should fail");
            assert_eq!(prepared_id(&failing).await, Some(1));
        }
        let mut stream = pin!(failing.query(params![1]));
        assert!(stream.next().await.expect("Expected an item").is_err());
        assert_eq!(prepared_id(&failing).await, Some(1));

        let connection = connection.lock().await;
        assert_eq!(connection.prepares, 1);
        assert!(connection.runs.iter().all(|v| v.prepared == Some(1)));
    }

    #[tokio::test]
    async fn dropped_streams_keep_the_statement() {
        let connection = connect().await;
        let statement = LazyStatement::prepare(connection.clone(), "SELECT ?").await;
        {
            let mut stream = pin!(statement.query(params![1, 2, 3]));
            let row = stream
                .try_next()
                .await
                .expect("Query failed")
                .expect("No row returned");
            assert_eq!(row.values(), [Value::Int64(Some(1))]);
        }
        assert_eq!(prepared_id(&statement).await, Some(1));

        // Interrupted while the driver holds the statement
        let expired = Context::background().with_timeout(Duration::ZERO);
        statement
            .query_row_with_context(&expired, params![1])
            .await
            .expect_err("Should be expired");
        assert_eq!(prepared_id(&statement).await, Some(1));
        statement.query_row(params![4]).await.expect("Query failed");
        assert_eq!(connection.lock().await.prepares, 1);
    }

    #[tokio::test]
    async fn statements_run_inside_a_query_loop() {
        let connection = connect().await;
        let select = LazyStatement::prepare(connection.clone(), "SELECT ?").await;
        let insert = LazyStatement::prepare(connection.clone(), "INSERT ?").await;
        let nested = async {
            let mut rows = pin!(select.query(params![1, 2, 3]));
            let mut inserted = 0;
            while let Some(row) = rows.try_next().await.expect("Query failed") {
                let value = row.get::<i64>(0).expect("Not an integer");
                inserted += insert
                    .execute(params![value])
                    .await
                    .expect("Nested execution failed")
                    .rows_affected
                    .unwrap_or_default();
                let again = select
                    .query_row(params![value])
                    .await
                    .expect("Nested query failed");
                assert!(again.is_some());
            }
            inserted
        };
        let inserted = timeout(Duration::from_secs(5), nested)
            .await
            .expect("Nested statements blocked on the executor");
        assert_eq!(inserted, 3);
        assert_eq!(connection.lock().await.runs.len(), 7);
    }

    #[tokio::test]
    async fn raw_returns_the_text() {
        let connection = connect().await;
        connection.lock().await.fail_prepare = true;
        let sql = "SELECT ? /* untouched */";
        let statement = LazyStatement::prepare(connection.clone(), sql).await;
        assert_eq!(statement.raw(), sql);
        assert_eq!(statement.to_string(), sql);
        connection.lock().await.fail_prepare = false;
        let _ = statement.resolve().await;
        assert_eq!(statement.raw(), sql);
        assert!(Arc::ptr_eq(statement.executor(), &connection));
    }

    #[tokio::test]
    async fn concurrent_first_use_prepares_once() {
        let connection = connect().await;
        let statement = Arc::new(LazyStatement::deferred(connection.clone(), "SELECT ?"));
        let results = join_all((0..8).map(|i| {
            let statement = statement.clone();
            async move { statement.query_row(params![i]).await }
        }))
        .await;
        assert!(results.iter().all(|v| matches!(v, Ok(Some(..)))));
        let connection = connection.lock().await;
        assert_eq!(connection.prepares, 1);
        assert_eq!(connection.runs.len(), 8);
        assert!(connection.runs.iter().all(|v| v.prepared == Some(1)));
    }

    #[tokio::test]
    async fn concurrent_tasks_share_the_statement() {
        let connection = connect().await;
        let statement = Arc::new(LazyStatement::prepare(connection.clone(), "INSERT ?").await);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let statement = statement.clone();
                tokio::spawn(async move { statement.execute(params![i]).await })
            })
            .collect();
        for handle in handles {
            handle
                .await
                .expect("Task panicked")
                .expect("Execution failed");
        }
        assert_eq!(connection.lock().await.prepares, 1);
    }

    #[tokio::test]
    async fn context_errors() {
        let connection = connect().await;
        let statement = LazyStatement::prepare(connection.clone(), "SELECT ?").await;

        let (context, cancel) = Context::background().with_cancel();
        let row = statement
            .query_row_with_context(&context, params![1])
            .await
            .expect("Query failed");
        assert!(row.is_some());
        cancel.cancel();
        let error = statement
            .execute_with_context(&context, params![1])
            .await
            .expect_err("Should be canceled");
        assert_eq!(
            error.downcast_ref::<ContextError>(),
            Some(&ContextError::Canceled)
        );

        let expired = Context::background().with_timeout(Duration::ZERO);
        let error = statement
            .query_row_with_context(&expired, params![1])
            .await
            .expect_err("Should be expired");
        assert_eq!(
            error.downcast_ref::<ContextError>(),
            Some(&ContextError::DeadlineExceeded)
        );
        {
            let mut stream = pin!(statement.query_with_context(&expired, params![1, 2]));
            let error = stream
                .next()
                .await
                .expect("Expected an item")
                .expect_err("Should be expired");
            assert_eq!(
                error.downcast_ref::<ContextError>(),
                Some(&ContextError::DeadlineExceeded)
            );
        }

        // The statement survives the aborted calls
        assert!(statement.is_prepared().await);
        let rows: Vec<_> = statement
            .query_with_context(&Context::background(), params![1, 2])
            .try_collect()
            .await
            .expect("Query failed");
        assert_eq!(rows.len(), 2);
    }
}
