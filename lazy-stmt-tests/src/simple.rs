use lazy_stmt::{Executor, LazyStatement, Mutex, Query, params, stream::TryStreamExt};
use std::sync::Arc;

pub async fn select_one<E: Executor>(executor: &Arc<Mutex<E>>) {
    let statement = LazyStatement::prepare(executor.clone(), "SELECT 1").await;
    assert_eq!(statement.raw(), "SELECT 1");
    {
        let resolved = statement.resolve().await.expect("SELECT 1 should prepare");
        assert!(matches!(*resolved, Query::Prepared(..)));
    }
    let rows: Vec<_> = statement
        .query(params![])
        .try_collect()
        .await
        .expect("Could not query SELECT 1");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<i64>(0).expect("Not an integer"), 1);

    // Same statement, many times
    for _ in 0..3 {
        let row = statement
            .query_row(params![])
            .await
            .expect("Could not query SELECT 1")
            .expect("SELECT 1 returned no row");
        assert_eq!(row.get::<i32>(0).expect("Not an integer"), 1);
    }
    assert!(statement.is_prepared().await);
    assert_eq!(statement.raw(), "SELECT 1");
}
