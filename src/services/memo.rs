//! Memo service: persistent note text with debounced writes.
//!
//! DESIGN
//! ======
//! The memo is one string under `noteText`. Edits update the in-memory text
//! immediately and schedule a write after the input has been idle for the
//! debounce interval. Every edit, clear, or flush bumps a generation counter;
//! a debounced task whose generation is no longer current skips its write, so
//! a burst of edits produces a single write of the last value.
//!
//! Writes are serialized by `write_lock` and the generation is checked while
//! holding it. Tasks are never aborted mid-write: a dropped `set` future does
//! not stop the SQLite worker from finishing the statement, which could let a
//! stale value land after a later `clear` or `flush`.
//!
//! TRADE-OFFS
//! ==========
//! An edit followed by process exit inside the debounce window is lost unless
//! `flush` runs first. `main` flushes on graceful shutdown.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::kv::{KeyValueStore, StoreError};
use crate::services::links;

pub const NOTE_TEXT_KEY: &str = "noteText";
pub const DEFAULT_MEMO_DEBOUNCE_MS: u64 = 200;

pub struct MemoSession {
    store: Arc<dyn KeyValueStore>,
    debounce: Duration,
    inner: Arc<Mutex<MemoInner>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

struct MemoInner {
    /// Latest text, including edits not yet written.
    text: String,
    /// Bumped by every edit, clear, and flush.
    generation: u64,
    /// Latest scheduled debounced write, if any.
    pending: Option<JoinHandle<()>>,
}

impl MemoInner {
    fn has_pending_write(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Invalidate any scheduled write. Returns whether one was still pending.
    fn cancel_pending(&mut self) -> bool {
        let was_pending = self.has_pending_write();
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
        was_pending
    }
}

fn lock_inner(inner: &Mutex<MemoInner>) -> std::sync::MutexGuard<'_, MemoInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoSession {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            inner: Arc::new(Mutex::new(MemoInner { text: String::new(), generation: 0, pending: None })),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoInner> {
        lock_inner(&self.inner)
    }

    /// Load the memo for a page opened with `query`.
    ///
    /// A stored string wins. Otherwise a non-empty `text` parameter becomes
    /// the memo and is persisted. Otherwise the memo is empty. While a
    /// debounced write is pending the in-memory text is newer than the store
    /// and is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read or the initial
    /// text cannot be written.
    pub async fn load(&self, query: &str) -> Result<String, StoreError> {
        {
            let inner = self.lock();
            if inner.has_pending_write() {
                return Ok(inner.text.clone());
            }
        }

        let text = match self.store.get(NOTE_TEXT_KEY).await? {
            Some(Value::String(saved)) => saved,
            _ => match links::parse_initial_text(query) {
                Some(initial) => {
                    self.store.set(NOTE_TEXT_KEY, &Value::String(initial.clone())).await?;
                    debug!(len = initial.len(), "memo seeded from query string");
                    initial
                }
                None => String::new(),
            },
        };

        self.lock().text.clone_from(&text);
        Ok(text)
    }

    /// Record an edit and (re)schedule the debounced write.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn edit(&self, text: String) {
        let store = self.store.clone();
        let state = self.inner.clone();
        let write_lock = self.write_lock.clone();
        let debounce = self.debounce;
        let value = Value::String(text.clone());

        let mut inner = self.lock();
        inner.cancel_pending();
        let generation = inner.generation;
        inner.text = text;
        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _write = write_lock.lock().await;
            if lock_inner(&state).generation != generation {
                return;
            }
            if let Err(e) = store.set(NOTE_TEXT_KEY, &value).await {
                warn!(error = %e, "memo: debounced write failed");
            }
        }));
    }

    /// Drop any pending write and persist an empty memo immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        {
            let mut inner = self.lock();
            inner.cancel_pending();
            inner.text.clear();
        }
        let _write = self.write_lock.lock().await;
        self.store.set(NOTE_TEXT_KEY, &Value::String(String::new())).await
    }

    /// Write a pending edit now instead of waiting for the debounce timer.
    /// No-op when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let text = {
            let mut inner = self.lock();
            if !inner.cancel_pending() {
                return Ok(());
            }
            inner.text.clone()
        };
        let _write = self.write_lock.lock().await;
        self.store.set(NOTE_TEXT_KEY, &Value::String(text)).await
    }

    /// Latest in-memory text.
    #[must_use]
    pub fn current(&self) -> String {
        self.lock().text.clone()
    }
}

#[cfg(test)]
#[path = "memo_test.rs"]
mod tests;
