use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use checkin::{
    clock::SystemClock,
    config::ServiceConfig,
    repositories::{PgAttendanceStore, PgIdentityStore, PgShiftCatalog, RedisSessionStore},
    routes,
    state::{AppState, Backends},
};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting check-in service");

    let config = ServiceConfig::from_env()?;
    info!("Operational day follows {}", config.timezone);

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Initialize Redis for QR sessions
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    if redis_pool.health_check().await? {
        info!("Redis connection successful");
    } else {
        anyhow::bail!("Failed to connect to Redis");
    }

    let backends = Backends {
        identities: Arc::new(PgIdentityStore::new(pool.clone())),
        sessions: Arc::new(RedisSessionStore::new(redis_pool)),
        attendances: Arc::new(PgAttendanceStore::new(pool.clone())),
        shifts: Arc::new(PgShiftCatalog::new(pool)),
    };
    let app_state = AppState::new(backends, Arc::new(SystemClock), &config);

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Check-in service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
