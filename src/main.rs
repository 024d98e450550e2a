use std::sync::Arc;

use memolinks::config::AppConfig;
use memolinks::db::kv::{KeyValueStore, SqliteKvStore};
use memolinks::shell::fetch::HttpFetcher;
use memolinks::shell::{ShellCache, ShellController};
use memolinks::{db, routes, state};
use sqlx::SqlitePool;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    match db::schema_version(&pool).await {
        Ok(version) => tracing::info!(schema_version = ?version, "database ready"),
        Err(e) => tracing::warn!(error = %e, "schema version unavailable"),
    }
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(pool.clone()));

    let mut state = state::AppState::new(store, config.memo_debounce)
        .await
        .expect("builder list load failed");

    // Shell controller is non-fatal: without it the API still works.
    if let Some(shell) = start_shell(&config, &pool).await {
        state = state.with_shell(shell);
    }

    let app = routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "memolinks listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    if let Err(e) = state.memo.flush().await {
        tracing::warn!(error = %e, "memo flush on shutdown failed");
    }
}

async fn start_shell(config: &AppConfig, pool: &SqlitePool) -> Option<Arc<ShellController>> {
    let origin = config.shell_origin.clone()?;

    let fetcher = match HttpFetcher::new(config.shell_fetch_timeout) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::warn!(error = %e, "shell fetcher unavailable; shell disabled");
            return None;
        }
    };

    let shell = ShellController::new(
        ShellCache::new(pool.clone()),
        Arc::new(fetcher),
        config.cache_version.clone(),
        origin,
    );

    if let Err(e) = shell.install().await {
        tracing::warn!(error = %e, "shell install failed; shell disabled");
        return None;
    }
    if let Err(e) = shell.activate().await {
        tracing::warn!(error = %e, "shell activation failed; shell disabled");
        return None;
    }

    tracing::info!(origin = %shell.origin(), version = shell.version(), "shell controller active");
    Some(Arc::new(shell))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
