//! Infrastructure error types
//!
//! Database and cache failures stay typed here; services decide how they
//! surface.

use redis::RedisError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error raised by the PostgreSQL layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Pool could not reach the server
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Schema migration failed to apply
    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Error raised by the Redis layer
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[source] RedisError),

    /// Command or script rejected by the server
    #[error("Redis command error: {0}")]
    Command(#[source] RedisError),

    #[error("Redis configuration error: {0}")]
    Configuration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

pub type CacheResult<T> = Result<T, CacheError>;
