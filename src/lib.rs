//! memolinks: a persistent memo plus URL-configured launch buttons, served
//! behind a cache-first offline shell.
//!
//! ARCHITECTURE
//! ============
//! - `db`: SQLite pool, schema migrations, and the key-value store.
//! - `services`: query-string button parsing, the builder list, share URLs,
//!   and the debounced memo session.
//! - `shell`: versioned shell cache and its install/activate/fetch controller.
//! - `routes`: Axum router exposing all of the above.

pub mod config;
pub mod db;
pub mod routes;
pub mod services;
pub mod shell;
pub mod state;
