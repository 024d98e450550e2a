//! Application configuration parsed from environment variables.

use std::time::Duration;

use url::Url;

use crate::services::memo::DEFAULT_MEMO_DEBOUNCE_MS;
use crate::shell::DEFAULT_CACHE_VERSION;
use crate::shell::fetch::DEFAULT_FETCH_TIMEOUT_SECS;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://memolinks.db";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SHELL_ORIGIN {value:?}: {source}")]
    InvalidShellOrigin { value: String, source: url::ParseError },
    #[error("SHELL_ORIGIN must be an http(s) origin, got {0:?}")]
    UnsupportedShellOrigin(String),
    #[error("CACHE_VERSION must not be empty")]
    EmptyCacheVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub memo_debounce: Duration,
    pub cache_version: String,
    /// Upstream serving the shell assets. `None` disables the shell controller.
    pub shell_origin: Option<Url>,
    pub shell_fetch_timeout: Duration,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: default `sqlite://memolinks.db`
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `MEMO_DEBOUNCE_MS`: default 200
    /// - `CACHE_VERSION`: default `memolinks-shell-v1`
    /// - `SHELL_ORIGIN`: unset disables the shell controller
    /// - `SHELL_FETCH_TIMEOUT_SECS`: default 15
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a malformed `SHELL_ORIGIN` or an empty
    /// `CACHE_VERSION`. Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let cache_version = lookup("CACHE_VERSION").unwrap_or_else(|| DEFAULT_CACHE_VERSION.to_owned());
        if cache_version.trim().is_empty() {
            return Err(ConfigError::EmptyCacheVersion);
        }

        let shell_origin = match lookup("SHELL_ORIGIN").filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(parse_origin(value.trim())?),
            None => None,
        };

        Ok(Self {
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            memo_debounce: Duration::from_millis(parse("MEMO_DEBOUNCE_MS").unwrap_or(DEFAULT_MEMO_DEBOUNCE_MS)),
            cache_version: cache_version.trim().to_owned(),
            shell_origin,
            shell_fetch_timeout: Duration::from_secs(
                parse("SHELL_FETCH_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
        })
    }
}

fn parse_origin(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|source| ConfigError::InvalidShellOrigin { value: value.to_owned(), source })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedShellOrigin(value.to_owned()));
    }
    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
