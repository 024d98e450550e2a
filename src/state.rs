//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the memo session, the builder list, and the optional shell
//! controller; nothing lives in process-wide statics. The memo and builder
//! each hold their own handle to the shared key-value store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::db::kv::KeyValueStore;
use crate::services::builder::{Builder, BuilderError};
use crate::services::memo::MemoSession;
use crate::shell::ShellController;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub memo: Arc<MemoSession>,
    /// Persist-then-commit must not interleave across requests.
    pub builder: Arc<Mutex<Builder>>,
    /// `None` when no shell origin is configured or the install failed.
    pub shell: Option<Arc<ShellController>>,
}

impl AppState {
    /// Build state over `store`, loading the persisted builder list.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder list cannot be read.
    pub async fn new(store: Arc<dyn KeyValueStore>, memo_debounce: Duration) -> Result<Self, BuilderError> {
        let memo = MemoSession::new(store.clone(), memo_debounce);
        let builder = Builder::load(store).await?;
        Ok(Self { memo: Arc::new(memo), builder: Arc::new(Mutex::new(builder)), shell: None })
    }

    #[must_use]
    pub fn with_shell(mut self, shell: Arc<ShellController>) -> Self {
        self.shell = Some(shell);
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
