//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to open the local SQLite database and bring its
//! schema up to date before the memo, builder, or shell cache touch it.
//!
//! SCHEMA VERSIONING
//! =================
//! Each file in `src/db/migrations` is one schema version. SQLx records the
//! versions it has applied, so an upgrade step runs once per version increase
//! and reopening an up-to-date database is a no-op.

pub mod kv;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Highest migration version shipped with this build.
pub const SCHEMA_VERSION: i64 = 2;

/// In-memory databases live and die with their connection, so they get a
/// single connection that is never recycled.
fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Open the SQLite pool, creating the database file if needed, and run
/// migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = if is_memory_url(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

/// Highest successfully applied schema version, or `None` on a database that
/// has never been migrated.
///
/// # Errors
///
/// Returns an error if the migrations bookkeeping table cannot be read.
pub async fn schema_version(pool: &SqlitePool) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
