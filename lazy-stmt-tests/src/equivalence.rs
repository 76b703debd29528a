use crate::table_name;
use indoc::formatdoc;
#[cfg(not(feature = "disable-named-params"))]
use lazy_stmt::{Arg, Value};
use lazy_stmt::{Executor, LazyStatement, Mutex, RawQuery, RowLabeled, params, stream::TryStreamExt};
use std::sync::Arc;

/// Prepared and unprepared runs of the same text and arguments give the same results.
pub async fn equivalence<E: Executor>(executor: &Arc<Mutex<E>>) {
    let table = table_name("equivalence");
    executor
        .lock()
        .await
        .execute(formatdoc! {"
            CREATE TABLE {table} (
                id INTEGER PRIMARY KEY,
                label TEXT,
                amount REAL,
                payload BLOB
            )
        ", table = table})
        .await
        .expect("Could not create the table");
    let insert = LazyStatement::prepare(
        executor.clone(),
        format!("INSERT INTO {table} (id, label, amount, payload) VALUES (?, ?, ?, ?)"),
    )
    .await;
    for i in 0..10_i64 {
        insert
            .execute(params![
                i,
                format!("label {i}"),
                i as f64 * 1.5,
                vec![i as u8, 0, 255]
            ])
            .await
            .expect("Could not insert");
    }
    insert
        .execute(params![10, None::<String>, None::<f64>, None::<Vec<u8>>])
        .await
        .expect("Could not insert the NULL row");

    let sql = format!("SELECT id, label, amount, payload FROM {table} WHERE id >= ? ORDER BY id");
    let statement = LazyStatement::prepare(executor.clone(), sql.clone()).await;
    assert!(statement.is_prepared().await);
    for from in [0, 5, 11] {
        let prepared: Vec<RowLabeled> = statement
            .query(params![from])
            .try_collect()
            .await
            .expect("Prepared query failed");
        let unprepared: Vec<RowLabeled> = executor
            .lock()
            .await
            .fetch(RawQuery::with_args(sql.clone(), params![from]))
            .try_collect()
            .await
            .expect("Unprepared query failed");
        assert_eq!(prepared, unprepared);
        assert_eq!(prepared.len(), (11 - from) as usize);
    }

    let update_sql = format!("UPDATE {table} SET amount = amount + 1 WHERE id < ?");
    let update = LazyStatement::prepare(executor.clone(), update_sql.clone()).await;
    let prepared = update.execute(params![4]).await.expect("Prepared update failed");
    let unprepared = executor
        .lock()
        .await
        .execute(RawQuery::with_args(update_sql, params![4]))
        .await
        .expect("Unprepared update failed");
    assert_eq!(prepared.rows_affected, Some(4));
    assert_eq!(prepared.rows_affected, unprepared.rows_affected);

    // Named parameters take their argument, the others take the positional ones in order
    #[cfg(not(feature = "disable-named-params"))]
    {
        let mixed = LazyStatement::prepare(executor.clone(), "SELECT :a, ?, :b").await;
        assert!(mixed.is_prepared().await);
        for args in [
            vec![Arg::named(":a", 1), Arg::positional(2), Arg::named("b", 3)],
            vec![Arg::positional(2), Arg::named("b", 3), Arg::named(":a", 1)],
        ] {
            let prepared = mixed
                .query_row(args.clone())
                .await
                .expect("Prepared query failed")
                .expect("No row returned");
            let unprepared = executor
                .lock()
                .await
                .fetch_one(RawQuery::with_args("SELECT :a, ?, :b", args))
                .await
                .expect("Unprepared query failed")
                .expect("No row returned");
            assert_eq!(
                prepared.values(),
                [Value::Int64(Some(1)), Value::Int64(Some(2)), Value::Int64(Some(3))]
            );
            assert_eq!(prepared.values(), unprepared.values());
        }
    }

    executor
        .lock()
        .await
        .execute(format!("DROP TABLE {table}"))
        .await
        .expect("Could not drop the table");
}
