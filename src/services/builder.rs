//! Builder service: persisted, user-edited list of launch buttons.
//!
//! DESIGN
//! ======
//! The list is loaded once from the key-value store under `builderItems` and
//! kept in memory. Every mutation builds the next list, persists it, and only
//! then replaces the in-memory copy. A failed write leaves both the store and
//! the in-memory list untouched.

use std::sync::Arc;

use tracing::{info, warn};

use crate::db::kv::{self, KeyValueStore, StoreError};
use crate::services::links::{ButtonList, LinkButton, ValidationError};
use crate::services::share;

pub const BUILDER_ITEMS_KEY: &str = "builderItems";

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("invalid {field}: {0}", field = .0.field())]
    Validation(#[from] ValidationError),
    #[error("index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub struct Builder {
    store: Arc<dyn KeyValueStore>,
    entries: ButtonList,
}

impl Builder {
    /// Load the persisted list. A missing value is an empty list; entries
    /// that no longer validate are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Storage`] if the store cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, BuilderError> {
        let entries = match kv::get_as::<ButtonList>(store.as_ref(), BUILDER_ITEMS_KEY).await {
            Ok(Some(stored)) => {
                let total = stored.len();
                let valid = stored.into_iter().filter(LinkButton::is_valid).collect::<ButtonList>();
                if valid.len() != total {
                    warn!(dropped = total - valid.len(), "builder: dropped invalid stored entries");
                }
                valid
            }
            Ok(None) => Vec::new(),
            Err(StoreError::Encoding(e)) => {
                warn!(error = %e, "builder: stored list unreadable; starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!(count = entries.len(), "builder list loaded");
        Ok(Self { store, entries })
    }

    #[must_use]
    pub fn list_entries(&self) -> &[LinkButton] {
        &self.entries
    }

    /// Validate and append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Validation`] naming the failing field, or
    /// [`BuilderError::Storage`] if the write fails. The list is unchanged on
    /// error.
    pub async fn add_entry(&mut self, title: &str, url: &str) -> Result<(), BuilderError> {
        let entry = validate_entry(title, url)?;
        let mut next = self.entries.clone();
        next.push(entry);
        self.commit(next).await
    }

    /// Remove the entry at `index` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::IndexOutOfRange`] or [`BuilderError::Storage`];
    /// the list is unchanged on error.
    pub async fn remove_entry(&mut self, index: usize) -> Result<LinkButton, BuilderError> {
        if index >= self.entries.len() {
            return Err(BuilderError::IndexOutOfRange { index, len: self.entries.len() });
        }
        let mut next = self.entries.clone();
        let removed = next.remove(index);
        self.commit(next).await?;
        Ok(removed)
    }

    /// Clear the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Storage`] if the write fails.
    pub async fn reset(&mut self) -> Result<(), BuilderError> {
        self.commit(Vec::new()).await
    }

    /// Share URL carrying every entry as a `btn=` parameter. The base is
    /// trimmed; an empty list returns just the trimmed base.
    #[must_use]
    pub fn build_share_url(&self, base: &str) -> String {
        share::build_share_url(base, None, &self.entries)
    }

    async fn commit(&mut self, next: ButtonList) -> Result<(), BuilderError> {
        kv::set_as(self.store.as_ref(), BUILDER_ITEMS_KEY, &next).await?;
        self.entries = next;
        Ok(())
    }
}

/// Builder input validation: the parser's rules plus no `|` in the title,
/// since the share format could not carry it.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`].
pub fn validate_entry(title: &str, url: &str) -> Result<LinkButton, ValidationError> {
    let entry = LinkButton::new(title, url)?;
    if entry.title.contains('|') {
        return Err(ValidationError::TitleContainsSeparator);
    }
    Ok(entry)
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
