use crate::{silent_logs, table_name};
use lazy_stmt::{Executor, LazyStatement, Mutex, RawQuery, named_params, params};
use std::sync::Arc;

pub async fn named_params<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("named");
    executor
        .lock()
        .await
        .execute(format!("CREATE TABLE {table} (name TEXT PRIMARY KEY, total INTEGER)"))
        .await
        .expect("Could not create the table");

    let upsert = LazyStatement::prepare(
        executor.clone(),
        format!(
            "INSERT INTO {table} (name, total) VALUES (:key, :value) \
             ON CONFLICT (name) DO UPDATE SET total = total + :value"
        ),
    )
    .await;
    assert!(upsert.is_prepared().await);
    upsert
        .execute(named_params![":key" => "a", ":value" => 1])
        .await
        .expect("Could not insert with prefixed names");
    upsert
        .execute(named_params!["key" => "a", "value" => 2])
        .await
        .expect("Could not insert with bare names");
    upsert
        .execute(named_params!["value" => 5, "key" => "b"])
        .await
        .expect("Could not insert with names out of order");

    let select = LazyStatement::prepare(
        executor.clone(),
        format!("SELECT total FROM {table} WHERE name = @key"),
    )
    .await;
    let row = select
        .query_row(named_params!["key" => "a"])
        .await
        .expect("Could not select")
        .expect("No row for key a");
    assert_eq!(row.get::<i64>(0).expect("Not an integer"), 3);
    let row = select
        .query_row(named_params!["@key" => "b"])
        .await
        .expect("Could not select")
        .expect("No row for key b");
    assert_eq!(row.get::<i64>(0).expect("Not an integer"), 5);

    // Same lookup, unprepared
    let row = executor
        .lock()
        .await
        .fetch_one(RawQuery::with_args(select.raw(), named_params!["key" => "b"]))
        .await
        .expect("Could not select")
        .expect("No row for key b");
    assert_eq!(row.get::<i64>(0).expect("Not an integer"), 5);

    silent_logs! {
        assert!(
            select.query_row(named_params!["missing" => 1]).await.is_err(),
            "Unknown parameter names are errors"
        );
    }
    // Positional arguments bind in order regardless of the names
    let row = select
        .query_row(params!["a"])
        .await
        .expect("Could not select")
        .expect("No row for key a");
    assert_eq!(row.get::<i64>(0).expect("Not an integer"), 3);

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
