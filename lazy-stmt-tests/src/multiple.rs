use crate::{silent_logs, table_name};
use indoc::formatdoc;
use lazy_stmt::{Executor, LazyStatement, Mutex, params};
use std::sync::Arc;

/// Text the backend cannot prepare as a single statement still runs through the fallback.
pub async fn multiple<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("multiple");
    executor
        .lock()
        .await
        .execute(format!("CREATE TABLE {table} (value INTEGER)"))
        .await
        .expect("Could not create the table");

    let insert;
    silent_logs! {
        insert = LazyStatement::prepare(
            executor.clone(),
            formatdoc! {"
                INSERT INTO {table} (value) VALUES (?);
                INSERT INTO {table} (value) VALUES (?), (?);
            ", table = table},
        )
        .await;
        assert!(!insert.is_prepared().await);
        for i in 0..2 {
            let affected = insert
                .execute(params![i * 3, i * 3 + 1, i * 3 + 2])
                .await
                .expect("Could not run the statements unprepared");
            assert_eq!(affected.rows_affected, Some(3));
        }
        assert!(!insert.is_prepared().await);
    }

    let row = LazyStatement::prepare(
        executor.clone(),
        format!("SELECT COUNT(*), SUM(value) FROM {table}"),
    )
    .await
    .query_row(params![])
    .await
    .expect("Could not count")
    .expect("COUNT returned no row");
    assert_eq!(row.get::<i64>(0).expect("Not an integer"), 6);
    assert_eq!(row.get::<i64>(1).expect("Not an integer"), 15);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
