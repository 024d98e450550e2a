//! Versioned response cache stored in SQLite.
//!
//! One partition per cache version; entries are keyed by absolute request URL
//! inside a partition. Deleting a partition deletes its entries.

use sqlx::SqlitePool;

use super::ShellResponse;

#[derive(Clone)]
pub struct ShellCache {
    pool: SqlitePool,
}

impl ShellCache {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the partition if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn open(&self, partition: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO cache_partitions (name) VALUES (?1)")
            .bind(partition)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Names of every existing partition, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn keys(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM cache_partitions ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    /// Delete a partition and its entries. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub async fn delete(&self, partition: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cache_entries WHERE partition = ?1")
            .bind(partition)
            .execute(tx.as_mut())
            .await?;
        let removed = sqlx::query("DELETE FROM cache_partitions WHERE name = ?1")
            .bind(partition)
            .execute(tx.as_mut())
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }

    /// Look up `url` in `partition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn lookup(&self, partition: &str, url: &str) -> Result<Option<ShellResponse>, sqlx::Error> {
        let row = sqlx::query_as::<_, (i64, Option<String>, Vec<u8>)>(
            "SELECT status, content_type, body FROM cache_entries WHERE partition = ?1 AND url = ?2",
        )
        .bind(partition)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(status, content_type, body)| ShellResponse {
            status: u16::try_from(status).unwrap_or(200),
            content_type,
            body,
        }))
    }

    /// Store one response, creating the partition if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub async fn put(&self, partition: &str, url: &str, response: &ShellResponse) -> Result<(), sqlx::Error> {
        self.put_all(partition, std::slice::from_ref(&(url.to_owned(), response.clone())))
            .await
    }

    /// Store several responses in one transaction: either all are stored or
    /// none are.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub async fn put_all(&self, partition: &str, entries: &[(String, ShellResponse)]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO cache_partitions (name) VALUES (?1)")
            .bind(partition)
            .execute(tx.as_mut())
            .await?;

        for (url, response) in entries {
            sqlx::query(
                r"INSERT INTO cache_entries (partition, url, status, content_type, body)
                  VALUES (?1, ?2, ?3, ?4, ?5)
                  ON CONFLICT (partition, url) DO UPDATE SET
                      status = excluded.status,
                      content_type = excluded.content_type,
                      body = excluded.body",
            )
            .bind(partition)
            .bind(url.as_str())
            .bind(i64::from(response.status))
            .bind(response.content_type.as_deref())
            .bind(response.body.as_slice())
            .execute(tx.as_mut())
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Number of entries in `partition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn entry_count(&self, partition: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries WHERE partition = ?1")
            .bind(partition)
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
