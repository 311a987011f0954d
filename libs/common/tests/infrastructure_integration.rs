//! Integration tests for the infrastructure components
//!
//! These tests verify that PostgreSQL (with the check-in schema applied) and
//! Redis are reachable. They need live services and are ignored by default:
//! `cargo test -- --ignored` runs them.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires running PostgreSQL and Redis"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;

    // The partial index backing the single-open-record rule must exist
    let row = sqlx::query(
        "SELECT COUNT(*) AS found FROM pg_indexes WHERE indexname = 'attendances_one_open_per_shift'",
    )
    .fetch_one(&pool)
    .await?;
    let found: i64 = row.get("found");
    assert_eq!(found, 1, "open-record index missing after migrations");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    Ok(())
}
