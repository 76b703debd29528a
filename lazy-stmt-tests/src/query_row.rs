use crate::table_name;
use lazy_stmt::{Executor, LazyStatement, Mutex, params, stream::TryStreamExt};
use std::{pin::pin, sync::Arc};

pub async fn query_row<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("query_row");
    executor
        .lock()
        .await
        .execute(format!(
            "CREATE TABLE {table} (id INTEGER PRIMARY KEY); \
             INSERT INTO {table} (id) VALUES (1), (2), (3), (4), (5);"
        ))
        .await
        .expect("Could not create the table");

    let select = LazyStatement::prepare(
        executor.clone(),
        format!("SELECT id FROM {table} WHERE id >= ? ORDER BY id"),
    )
    .await;
    assert!(select.is_prepared().await);
    for from in [1, 3, 5] {
        let row = select
            .query_row(params![from])
            .await
            .expect("Could not query the first row")
            .expect("No row returned");
        assert_eq!(row.get::<i64>(0).expect("Not an integer"), from);
        assert!(select.is_prepared().await, "The statement must survive query_row");
    }
    let none = select
        .query_row(params![6])
        .await
        .expect("Could not query the first row");
    assert!(none.is_none());

    // Stop reading halfway
    {
        let mut rows = pin!(select.query(params![1]));
        let first = rows
            .try_next()
            .await
            .expect("Could not read the first row")
            .expect("No row returned");
        assert_eq!(first.get::<i64>(0).expect("Not an integer"), 1);
    }
    let rows: Vec<_> = select
        .query(params![2])
        .try_collect()
        .await
        .expect("Could not query after an interrupted stream");
    let ids: Vec<i64> = rows
        .iter()
        .map(|v| v.get(0).expect("Not an integer"))
        .collect();
    assert_eq!(ids, [2, 3, 4, 5]);
    assert!(select.is_prepared().await);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
