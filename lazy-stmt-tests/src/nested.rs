use crate::table_name;
use lazy_stmt::{Executor, LazyStatement, Mutex, params, stream::TryStreamExt};
use std::{pin::pin, sync::Arc};

/// Statements sharing the executor run from inside the loop over another statement's rows.
pub async fn nested_statements<E: Executor>(executor: &Arc<Mutex<E>>) {
    let source = table_name("nested_source");
    let target = table_name("nested_target");
    for sql in [
        format!("CREATE TABLE {source} (id INTEGER PRIMARY KEY)"),
        format!("CREATE TABLE {target} (id INTEGER PRIMARY KEY, twice INTEGER)"),
        format!("INSERT INTO {source} (id) VALUES (1), (2), (3)"),
    ] {
        executor
            .lock()
            .await
            .execute(sql)
            .await
            .expect("Could not set up the tables");
    }

    let select = LazyStatement::prepare(
        executor.clone(),
        format!("SELECT id FROM {source} ORDER BY id"),
    )
    .await;
    let insert = LazyStatement::prepare(
        executor.clone(),
        format!("INSERT INTO {target} (id, twice) VALUES (?, ?)"),
    )
    .await;
    let mut rows = pin!(select.query(params![]));
    while let Some(row) = rows.try_next().await.expect("Could not read a row") {
        let id = row.get::<i64>(0).expect("Not an integer");
        insert
            .execute(params![id, id * 2])
            .await
            .expect("Nested insert failed");
    }

    let total = LazyStatement::prepare(executor.clone(), format!("SELECT SUM(twice) FROM {target}"))
        .await
        .query_row(params![])
        .await
        .expect("Could not sum")
        .expect("SUM returned no row");
    assert_eq!(total.get::<i64>(0).expect("Not an integer"), 12);

    for table in [source, target] {
        executor
            .lock()
            .await
            .execute(format!("DROP TABLE {table}"))
            .await
            .expect("Could not drop the table");
    }
}
