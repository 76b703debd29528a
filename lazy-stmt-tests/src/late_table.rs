use crate::{silent_logs, table_name};
use lazy_stmt::{Executor, LazyStatement, Mutex, params};
use std::sync::Arc;

/// A statement created before its table exists prepares as soon as the table is there.
pub async fn late_table<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("late_table");
    let insert;
    silent_logs! {
        insert = LazyStatement::prepare(
            executor.clone(),
            format!("INSERT INTO {table} (value) VALUES (?)"),
        )
        .await;
        assert!(!insert.is_prepared().await);
        assert!(
            insert.execute(params![1]).await.is_err(),
            "The table does not exist yet"
        );
        assert!(!insert.is_prepared().await);
    }

    executor
        .lock()
        .await
        .execute(format!("CREATE TABLE {table} (value INTEGER)"))
        .await
        .expect("Could not create the table");

    let affected = insert
        .execute(params![1])
        .await
        .expect("Insert failed after creating the table");
    assert_eq!(affected.rows_affected, Some(1));
    assert!(insert.is_prepared().await);
    let affected = insert.execute(params![2]).await.expect("Insert failed");
    assert_eq!(affected.rows_affected, Some(1));
    assert!(insert.is_prepared().await);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
