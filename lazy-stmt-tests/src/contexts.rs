use crate::table_name;
use lazy_stmt::{
    Context, ContextError, Executor, LazyStatement, Mutex, params,
    stream::{StreamExt, TryStreamExt},
};
use std::{pin::pin, sync::Arc, time::Duration};

pub async fn contexts<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("contexts");
    executor
        .lock()
        .await
        .execute(format!("CREATE TABLE {table} (value INTEGER)"))
        .await
        .expect("Could not create the table");
    let insert = LazyStatement::prepare(
        executor.clone(),
        format!("INSERT INTO {table} (value) VALUES (?)"),
    )
    .await;
    let count = LazyStatement::prepare(executor.clone(), format!("SELECT COUNT(*) FROM {table}")).await;

    let (context, cancel) = Context::background().with_cancel();
    let context = context.with_timeout(Duration::from_secs(60));
    let affected = insert
        .execute_with_context(&context, params![1])
        .await
        .expect("Could not insert within a live context");
    assert_eq!(affected.rows_affected, Some(1));

    cancel.cancel();
    let error = insert
        .execute_with_context(&context, params![2])
        .await
        .expect_err("The context is canceled");
    assert_eq!(
        error.downcast_ref::<ContextError>(),
        Some(&ContextError::Canceled)
    );
    let error = count
        .query_row_with_context(&context, params![])
        .await
        .expect_err("The context is canceled");
    assert_eq!(
        error.downcast_ref::<ContextError>(),
        Some(&ContextError::Canceled)
    );

    let expired = Context::background().with_timeout(Duration::ZERO);
    {
        let mut rows = pin!(count.query_with_context(&expired, params![]));
        let error = rows
            .next()
            .await
            .expect("The stream should report the deadline")
            .expect_err("The deadline passed");
        assert_eq!(
            error.downcast_ref::<ContextError>(),
            Some(&ContextError::DeadlineExceeded)
        );
    }

    // Nothing ran for the interrupted calls
    let rows: Vec<_> = count
        .query_with_context(&Context::background(), params![])
        .try_collect()
        .await
        .expect("Could not count");
    assert_eq!(rows[0].get::<i64>(0).expect("Not an integer"), 1);
    assert!(insert.is_prepared().await);
    assert!(count.is_prepared().await);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
