//! SQLite pool construction and schema migrations.
//!
//! [`create_pool`] is what the server and most tests use: it opens the
//! database (creating the file when needed) and applies the embedded
//! migrations. [`connect`] skips the migrations so callers can observe the
//! "schema not ready" state.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open a pool and bring the schema up to date.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, AppError> {
    let pool = connect(database_url).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Open a pool without touching the schema.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never reaped.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|err| AppError::Config(format!("Invalid DATABASE_URL: {}", err)))?
        .create_if_missing(true);

    let pool_options = if is_memory_url(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|err| AppError::Database(format!("migration failed: {}", err)))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Cheap liveness probe used by `/health`.
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
