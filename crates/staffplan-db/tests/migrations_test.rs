//! Integration tests for database migrations and table constraints.
//!
//! Each test runs against its own temporary database from
//! `staffplan-test-utils`, so tests are fully isolated and idempotent.

use staffplan_db::pool::{self, TABLES};
use staffplan_test_utils::TestDb;

#[tokio::test]
async fn migrations_create_all_tables() {
    let db = TestDb::new().await;

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT tablename::text FROM pg_tables \
         WHERE schemaname = 'public' \
         ORDER BY tablename",
    )
    .fetch_all(&db.pool)
    .await
    .expect("should list tables");

    let user_tables: Vec<&str> = rows
        .iter()
        .map(|(name,)| name.as_str())
        .filter(|t| !t.starts_with("_sqlx"))
        .collect();

    assert_eq!(
        user_tables,
        vec!["staff_allocations", "staff_plans"],
        "migration should create exactly the expected tables"
    );

    db.teardown().await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = TestDb::new().await;

    // TestDb already migrated once; a second run is a no-op.
    pool::run_migrations(&db.pool)
        .await
        .expect("second migration run should succeed");

    db.teardown().await;
}

#[tokio::test]
async fn table_counts_start_at_zero() {
    let db = TestDb::new().await;

    let counts = pool::table_counts(&db.pool).await.expect("should count");
    let names: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, TABLES);
    assert!(counts.iter().all(|(_, n)| *n == 0));

    db.teardown().await;
}

#[tokio::test]
async fn check_constraints_reject_bad_rows() {
    let db = TestDb::new().await;

    let zero_duration =
        sqlx::query("INSERT INTO staff_plans (name, duration_months) VALUES ('bad', 0)")
            .execute(&db.pool)
            .await;
    assert!(zero_duration.is_err(), "duration_months must be positive");

    let long_duration =
        sqlx::query("INSERT INTO staff_plans (name, duration_months) VALUES ('bad', 601)")
            .execute(&db.pool)
            .await;
    assert!(long_duration.is_err(), "duration_months must be at most 600");

    let high_margin = sqlx::query(
        "INSERT INTO staff_plans (name, duration_months, profit_margin) VALUES ('bad', 12, 101)",
    )
    .execute(&db.pool)
    .await;
    assert!(high_margin.is_err(), "profit_margin must be at most 100");

    db.teardown().await;
}
