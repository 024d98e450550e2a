//! Shell cache controller: cache-first offline shell for the memo page.
//!
//! DESIGN
//! ======
//! The controller reacts to three events:
//! - `install`: fetch every shell asset and store them under the current
//!   cache version in one transaction, then mark itself ready to take over
//!   without waiting for old clients.
//! - `activate`: delete every cache partition except the current version and
//!   claim open clients immediately.
//! - `fetch`: same-origin GETs are answered from the cache, falling back to
//!   the network; successful network responses are copied into the cache in
//!   a background task. Everything else passes through untouched.
//!
//! ERROR HANDLING
//! ==============
//! Cache write failures on the fetch path are logged and swallowed; the
//! caller still gets the network response. A network failure with no cached
//! copy propagates as [`NetworkError`]; no offline page is synthesized.

pub mod cache;
pub mod fetch;

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::Method;
use tracing::{debug, info, warn};
use url::Url;

pub use cache::ShellCache;
pub use fetch::{Fetcher, NetworkError};

/// Paths cached at install time, resolved against the shell origin.
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/app.js",
    "/db.js",
    "/manifest.webmanifest",
    "/assets/icon-192.png",
    "/assets/icon-512.png",
];

pub const DEFAULT_CACHE_VERSION: &str = "memolinks-shell-v1";

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ShellRequest {
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, content_type: None, body: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ShellResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// How the controller dealt with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from the current cache partition.
    Cached(ShellResponse),
    /// Cache miss; fetched from the network.
    Network(ShellResponse),
    /// Not intercepted; the caller sends it to the network itself.
    Passthrough,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the controller never takes over.
    Redundant,
}

struct Lifecycle {
    state: LifecycleState,
    /// Set once install succeeds: take over without waiting for old clients.
    skip_waiting: bool,
    /// Set once activate succeeds: open clients are controlled immediately.
    claimed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("controller is {actual:?}, expected {expected:?}")]
    InvalidState { expected: LifecycleState, actual: LifecycleState },
    #[error("invalid shell asset path {path}: {source}")]
    AssetUrl { path: String, source: url::ParseError },
    #[error("shell asset {url} could not be fetched: {source}")]
    AssetFetch { url: String, source: NetworkError },
    #[error("shell asset {url} returned status {status}")]
    AssetStatus { url: String, status: u16 },
    #[error("cache storage error: {0}")]
    Cache(#[from] sqlx::Error),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ShellController {
    cache: ShellCache,
    fetcher: Arc<dyn Fetcher>,
    version: String,
    origin: Url,
    lifecycle: Mutex<Lifecycle>,
}

impl ShellController {
    #[must_use]
    pub fn new(cache: ShellCache, fetcher: Arc<dyn Fetcher>, version: impl Into<String>, origin: Url) -> Self {
        Self {
            cache,
            fetcher,
            version: version.into(),
            origin,
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Parsed,
                skip_waiting: false,
                claimed: false,
            }),
        }
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, expected: LifecycleState, next: LifecycleState) -> Result<(), ShellError> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != expected {
            return Err(ShellError::InvalidState { expected, actual: lifecycle.state });
        }
        lifecycle.state = next;
        Ok(())
    }

    fn set_state(&self, state: LifecycleState) {
        self.lifecycle().state = state;
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle().state
    }

    #[must_use]
    pub fn skips_waiting(&self) -> bool {
        self.lifecycle().skip_waiting
    }

    #[must_use]
    pub fn has_claimed_clients(&self) -> bool {
        self.lifecycle().claimed
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    #[must_use]
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Shell asset paths resolved against the origin.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::AssetUrl`] if a path cannot be joined.
    pub fn asset_urls(&self) -> Result<Vec<Url>, ShellError> {
        SHELL_ASSETS
            .iter()
            .map(|path| {
                self.origin
                    .join(path)
                    .map_err(|source| ShellError::AssetUrl { path: (*path).to_owned(), source })
            })
            .collect()
    }

    /// Populate the current cache version with every shell asset.
    ///
    /// Nothing is stored unless every asset fetch succeeds with a 2xx status.
    /// On failure the controller becomes [`LifecycleState::Redundant`].
    ///
    /// # Errors
    ///
    /// Returns a [`ShellError`] describing the first failure.
    pub async fn install(&self) -> Result<(), ShellError> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)?;

        match self.populate_shell().await {
            Ok(count) => {
                let mut lifecycle = self.lifecycle();
                lifecycle.state = LifecycleState::Installed;
                lifecycle.skip_waiting = true;
                drop(lifecycle);
                info!(version = %self.version, count, "shell installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Redundant);
                warn!(version = %self.version, error = %e, "shell install failed");
                Err(e)
            }
        }
    }

    async fn populate_shell(&self) -> Result<usize, ShellError> {
        let urls = self.asset_urls()?;
        let mut entries = Vec::with_capacity(urls.len());

        for url in urls {
            let response = self
                .fetcher
                .fetch(&ShellRequest::get(url.clone()))
                .await
                .map_err(|source| ShellError::AssetFetch { url: url.to_string(), source })?;
            if !response.is_success() {
                return Err(ShellError::AssetStatus { url: url.to_string(), status: response.status });
            }
            entries.push((url.to_string(), response));
        }

        self.cache.open(&self.version).await?;
        self.cache.put_all(&self.version, &entries).await?;
        Ok(entries.len())
    }

    /// Delete every cache partition other than the current version and claim
    /// open clients. Returns the deleted partition names.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::InvalidState`] unless install succeeded, or
    /// [`ShellError::Cache`] if the cleanup fails. A failed cleanup leaves the
    /// controller installed so activation can be retried.
    pub async fn activate(&self) -> Result<Vec<String>, ShellError> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating)?;

        match self.delete_stale_partitions().await {
            Ok(deleted) => {
                let mut lifecycle = self.lifecycle();
                lifecycle.state = LifecycleState::Activated;
                lifecycle.claimed = true;
                drop(lifecycle);
                info!(version = %self.version, deleted = deleted.len(), "shell activated");
                Ok(deleted)
            }
            Err(e) => {
                self.set_state(LifecycleState::Installed);
                Err(e)
            }
        }
    }

    async fn delete_stale_partitions(&self) -> Result<Vec<String>, ShellError> {
        let mut deleted = Vec::new();
        for name in self.cache.keys().await? {
            if name == self.version {
                continue;
            }
            if self.cache.delete(&name).await? {
                debug!(partition = %name, "deleted stale shell cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Handle one request.
    ///
    /// Only same-origin GETs are intercepted, and only once clients have
    /// been claimed; everything else is [`FetchOutcome::Passthrough`].
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when the request missed the cache and the
    /// network fetch failed.
    pub async fn handle_fetch(&self, request: &ShellRequest) -> Result<FetchOutcome, NetworkError> {
        if request.method != Method::GET || !self.is_same_origin(&request.url) || !self.has_claimed_clients() {
            return Ok(FetchOutcome::Passthrough);
        }

        let key = request.url.as_str();
        match self.cache.lookup(&self.version, key).await {
            Ok(Some(cached)) => return Ok(FetchOutcome::Cached(cached)),
            Ok(None) => {}
            Err(e) => warn!(url = %key, error = %e, "shell cache lookup failed; using network"),
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            self.store_in_background(key.to_owned(), response.clone());
        }
        Ok(FetchOutcome::Network(response))
    }

    fn store_in_background(&self, url: String, response: ShellResponse) {
        let cache = self.cache.clone();
        let version = self.version.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.put(&version, &url, &response).await {
                debug!(url = %url, error = %e, "shell cache write skipped");
            }
        });
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
