#[cfg(test)]
mod tests {
    use indoc::indoc;
    use lazy_stmt_core::{
        Arg, Connection, Executor, Prepared, Query, RawQuery, Value, named_params, params,
        stream::{StreamExt, TryStreamExt},
    };
    use lazy_stmt_sqlite::SQLiteConnection;
    use lazy_stmt_tests::{init_logs, silent_logs};
    use std::{env, fs, pin::pin, process};

    async fn memory() -> SQLiteConnection {
        SQLiteConnection::connect("sqlite://:memory:".into())
            .await
            .expect("Could not open an in memory database")
    }

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let path = env::temp_dir().join(format!("lazy_stmt_creation_{}.sqlite", process::id()));
        let path = path.to_string_lossy().into_owned();
        let _ = fs::remove_file(&path);
        SQLiteConnection::connect(format!("sqlite://{path}?mode=rwc").into())
            .await
            .expect("Could not create the database");
        assert!(fs::metadata(&path).is_ok(), "The database file should exist");
        SQLiteConnection::connect(format!("sqlite://{path}?mode=ro").into())
            .await
            .expect("Could not open the database read only");
        fs::remove_file(&path).expect("Could not remove the database file");
        silent_logs! {
            assert!(
                SQLiteConnection::connect(format!("sqlite://{path}?mode=ro").into())
                    .await
                    .is_err(),
                "A missing database cannot be opened read only"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        init_logs();
        silent_logs! {
            assert!(
                SQLiteConnection::connect("duckdb://some_value".into())
                    .await
                    .is_err()
            );
        }
    }

    #[tokio::test]
    async fn prepare_rejects_multiple_statements() {
        init_logs();
        let mut connection = memory().await;
        silent_logs! {
            assert!(connection.prepare("SELECT 1; SELECT 2").await.is_err());
            assert!(connection.prepare("   ").await.is_err());
            assert!(connection.prepare("SELEC 1").await.is_err());
        }
        let query = connection
            .prepare("SELECT 1;  ")
            .await
            .expect("A trailing semicolon is fine");
        assert!(query.is_prepared());
    }

    #[tokio::test]
    async fn unprepared_multiple_statements() {
        init_logs();
        let mut connection = memory().await;
        let affected = connection
            .execute(RawQuery::with_args(
                indoc! {"
                    CREATE TABLE numbers (value INTEGER, label TEXT);
                    -- comment between statements
                    INSERT INTO numbers VALUES (?, :label);
                    INSERT INTO numbers VALUES (?, :label), (?, 'other');
                "},
                params![1, 2, 3]
                    .into_iter()
                    .chain(named_params![":label" => "same"]),
            ))
            .await
            .expect("Could not run the statements");
        assert_eq!(affected.rows_affected, Some(3));
        let rows: Vec<_> = connection
            .fetch("SELECT value, label FROM numbers ORDER BY value")
            .try_collect()
            .await
            .expect("Could not select");
        let values: Vec<(i64, String)> = rows
            .iter()
            .map(|v| (v.get(0).unwrap(), v.get(1).unwrap()))
            .collect();
        assert_eq!(
            values,
            [(1, "same".into()), (2, "same".into()), (3, "other".into())]
        );

        silent_logs! {
            assert!(
                connection
                    .execute(RawQuery::with_args("SELECT ?", params![1, 2]))
                    .await
                    .is_err(),
                "Extra arguments must be reported"
            );
            assert!(
                connection
                    .execute(RawQuery::with_args("SELECT :a", named_params!["b" => 1]))
                    .await
                    .is_err(),
                "Unknown names must be reported"
            );
        }
    }

    #[tokio::test]
    async fn prepared_statement_is_returned() {
        init_logs();
        let mut connection = memory().await;
        let mut query = connection
            .prepare("SELECT ?1 + 1, @name AS name")
            .await
            .expect("Could not prepare");
        let Query::Prepared(prepared) = &mut query else {
            panic!("Expected a prepared query");
        };
        assert_eq!(prepared.parameter_count(), 2);
        prepared.bind(41).expect("Could not bind");
        prepared.bind_named("name", "x").expect("Could not bind by name");
        let row = connection
            .fetch_one(&mut query)
            .await
            .expect("Could not run")
            .expect("No row");
        assert_eq!(row.get::<i64>(0).unwrap(), 42);
        assert_eq!(row.get_named::<String>("name").unwrap(), "x");
        assert!(query.is_prepared(), "The statement must be handed back");

        // Bindings are cleared after each run
        query.bind(1).expect("Could not bind");
        let row = connection
            .fetch_one(&mut query)
            .await
            .expect("Could not run")
            .expect("No row");
        assert_eq!(row.get::<i64>(0).unwrap(), 2);
        assert_eq!(row.values()[1], Value::Null);

        silent_logs! {
            assert!(query.bind_named("missing", 1).is_err());
        }
    }

    #[tokio::test]
    async fn failed_and_dropped_runs_keep_the_statement() {
        init_logs();
        let mut connection = memory().await;
        connection
            .execute("CREATE TABLE unique_values (value INTEGER PRIMARY KEY)")
            .await
            .expect("Could not create the table");
        let mut insert = connection
            .prepare("INSERT INTO unique_values VALUES (?)")
            .await
            .expect("Could not prepare");
        let handle = format!("{insert:?}");
        insert.bind(1).expect("Could not bind");
        connection.execute(&mut insert).await.expect("Could not insert");
        insert.bind(1).expect("Could not bind");
        silent_logs! {
            assert!(connection.execute(&mut insert).await.is_err());
        }
        assert!(insert.is_prepared());
        assert_eq!(format!("{insert:?}"), handle);

        connection
            .execute("INSERT INTO unique_values VALUES (2), (3), (4)")
            .await
            .expect("Could not insert");
        let mut select = connection
            .prepare("SELECT value FROM unique_values ORDER BY value")
            .await
            .expect("Could not prepare");
        let handle = format!("{select:?}");
        {
            let mut rows = pin!(connection.fetch(&mut select));
            let first = rows
                .next()
                .await
                .expect("Expected a row")
                .expect("Could not fetch");
            assert_eq!(first.get::<i64>(0).unwrap(), 1);
        }
        assert!(select.is_prepared());
        assert_eq!(format!("{select:?}"), handle);
        let rows: Vec<_> = connection
            .fetch(&mut select)
            .try_collect()
            .await
            .expect("Could not fetch after the interrupted run");
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn mixed_arguments_bind_alike() {
        init_logs();
        let mut connection = memory().await;
        let args = vec![Arg::positional(2), Arg::named(":a", 1)];
        let mut prepared = connection
            .prepare("SELECT :a, ?")
            .await
            .expect("Could not prepare");
        prepared.bind_args(args.clone()).expect("Could not bind");
        let prepared = connection
            .fetch_one(&mut prepared)
            .await
            .expect("Could not run")
            .expect("No row");
        let unprepared = connection
            .fetch_one(RawQuery::with_args("SELECT :a, ?", args))
            .await
            .expect("Could not run")
            .expect("No row");
        assert_eq!(prepared.values(), [Value::Int64(Some(1)), Value::Int64(Some(2))]);
        assert_eq!(prepared.values(), unprepared.values());
    }
}
