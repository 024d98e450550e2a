//! Key-value store backing the memo text and the builder list.
//!
//! DESIGN
//! ======
//! Values are arbitrary JSON documents stored as text in the `kv` table.
//! Every operation is a single statement, so SQLite's transaction gives each
//! call atomicity and serializes concurrent callers. `get` of a missing key is
//! `Ok(None)`, never an error.
//!
//! Callers hold the store as `Arc<dyn KeyValueStore>` so tests can wrap it
//! (e.g. to count writes) without a second storage backend.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::SqlitePool;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("value encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Asynchronous string-keyed store of JSON values.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value under `key`, or `None` if the key was never set.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the storage medium fails.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or overwrite the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the storage medium fails.
    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the storage medium fails.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every key.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the storage medium fails.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Typed read: deserialize the stored value into `T`.
///
/// # Errors
///
/// Returns [`StoreError::Encoding`] if the stored value does not match `T`.
pub async fn get_as<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Typed write: serialize `value` and store it under `key`.
///
/// # Errors
///
/// Returns a [`StoreError`] if serialization or the write fails.
pub async fn set_as<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value)?;
    store.set(key, &value).await
}

// =============================================================================
// SQLITE BACKEND
// =============================================================================

#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Wrap an already-migrated pool (see [`super::init_pool`]).
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        sqlx::query(
            r"INSERT INTO kv (key, value) VALUES (?1, ?2)
              ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_test.rs"]
mod tests;
