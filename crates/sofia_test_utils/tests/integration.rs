//! Integration tests for the Docker test infrastructure.
//!
//! Run with:
//!   cargo test -p sofia_test_utils --features docker-tests

#![cfg(feature = "docker-tests")]

use sofia_test_utils::{PgVersion, PostgresTestGuard, TestPgPool};

#[tokio::test]
async fn test_postgres16_connection() {
    let pool = TestPgPool::new(PgVersion::Postgres16).await.unwrap();
    pool.execute("SELECT 1").await.unwrap();
}

#[tokio::test]
async fn test_guards_get_distinct_schemas() {
    let pool = TestPgPool::new(PgVersion::Postgres16).await.unwrap();
    let guard1 = PostgresTestGuard::new(pool.pool.clone()).await.unwrap();
    let guard2 = PostgresTestGuard::new(pool.pool.clone()).await.unwrap();

    assert_ne!(guard1.schema_name(), guard2.schema_name());

    let t1 = guard1.qualified("events");
    let t2 = guard2.qualified("events");
    guard1.execute(&format!("CREATE TABLE {t1} (id INT)")).await.unwrap();
    guard2.execute(&format!("CREATE TABLE {t2} (id INT)")).await.unwrap();
    guard1.execute(&format!("INSERT INTO {t1} VALUES (1), (2)")).await.unwrap();

    let count1: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {t1}"))
        .fetch_one(guard1.pool())
        .await
        .unwrap();
    let count2: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {t2}"))
        .fetch_one(guard2.pool())
        .await
        .unwrap();
    assert_eq!(count1, 2);
    assert_eq!(count2, 0);

    guard1.cleanup().await.unwrap();
    guard2.cleanup().await.unwrap();
}
