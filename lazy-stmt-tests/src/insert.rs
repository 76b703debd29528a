use crate::{prepared_handle, table_name};
use lazy_stmt::{Executor, LazyStatement, Mutex, params};
use std::sync::Arc;

pub async fn insert_twice<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("insert_twice");
    executor
        .lock()
        .await
        .execute(format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"))
        .await
        .expect("Could not create the table");

    let insert = LazyStatement::prepare(
        executor.clone(),
        format!("INSERT INTO {table} (id, name) VALUES (?, ?)"),
    )
    .await;
    assert!(insert.is_prepared().await);
    let affected = insert
        .execute(params![1, "first"])
        .await
        .expect("First insert failed");
    assert_eq!(affected.rows_affected, Some(1));
    let affected = insert
        .execute(params![2, "second"])
        .await
        .expect("Second insert failed");
    assert_eq!(affected.rows_affected, Some(1));
    assert_eq!(affected.last_affected_id, Some(2));
    assert!(insert.is_prepared().await);

    // Constraint violations are execution errors, they do not drop the statement
    let handle = prepared_handle(&insert).await;
    assert!(handle.is_some());
    crate::silent_logs! {
        assert!(insert.execute(params![2, "again"]).await.is_err());
        assert!(insert.execute(params![1, "again"]).await.is_err());
    }
    assert!(insert.is_prepared().await);
    assert_eq!(prepared_handle(&insert).await, handle);
    insert
        .execute(params![3, "third"])
        .await
        .expect("Insert after a failure failed");
    assert_eq!(prepared_handle(&insert).await, handle);

    let count = LazyStatement::prepare(executor.clone(), format!("SELECT COUNT(*) FROM {table}"))
        .await
        .query_row(params![])
        .await
        .expect("Could not count")
        .expect("COUNT returned no row");
    assert_eq!(count.get::<i64>(0).expect("Not an integer"), 3);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
