//! Launch-button configuration parsed from a page query string.
//!
//! DESIGN
//! ======
//! Two encodings are accepted and concatenated in this order:
//! - repeated `btn=title|url` parameters, in query order;
//! - one bulk `buttons=title|url;title|url` parameter, in list order.
//!
//! Each pair splits on the first `|`; anything after it belongs to the url.
//!
//! DECODING
//! ========
//! Parameter values are percent-decoded exactly once, by the query-string
//! layer (`+` reads as a space), before the pair is split. The title and the
//! url are decoded the same way; neither gets a second pass. This is what
//! makes `btn=A%7Chttp://e.com` and `btn=A|http://e.com` equivalent.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const BTN_PARAM: &str = "btn";
pub const BULK_PARAM: &str = "buttons";
pub const TEXT_PARAM: &str = "text";

const PAIR_SEPARATOR: char = '|';
const BULK_SEPARATOR: char = ';';

// =============================================================================
// LINK BUTTON
// =============================================================================

/// A validated launch button: non-empty title, `http(s)://` url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub title: String,
    pub url: String,
}

pub type ButtonList = Vec<LinkButton>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Url,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => f.write_str("title"),
            Self::Url => f.write_str("url"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must not contain '|'")]
    TitleContainsSeparator,
    #[error("url must start with http:// or https://")]
    UnsupportedScheme,
}

impl ValidationError {
    /// The input field that failed validation.
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::EmptyTitle | Self::TitleContainsSeparator => Field::Title,
            Self::UnsupportedScheme => Field::Url,
        }
    }
}

impl LinkButton {
    /// Trim both halves and validate them.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the trimmed title is empty or the url
    /// does not start with `http://` or `https://` (any case).
    pub fn new(title: &str, url: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !has_http_scheme(url) {
            return Err(ValidationError::UnsupportedScheme);
        }
        Ok(Self { title: title.to_owned(), url: url.to_owned() })
    }

    /// Whether this button would survive [`LinkButton::new`] unchanged.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Self::new(&self.title, &self.url).is_ok_and(|checked| checked == *self)
    }
}

/// Case-insensitive `^https?://` check.
#[must_use]
pub fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| url.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix));
    starts_with("http://") || starts_with("https://")
}

// =============================================================================
// DEFAULTS
// =============================================================================

/// Buttons shown when the query string configures none.
#[must_use]
pub fn default_buttons() -> ButtonList {
    [
        ("X", "https://x.com/home"),
        ("YouTube", "https://www.youtube.com/"),
        ("Instagram", "https://www.instagram.com/"),
    ]
    .into_iter()
    .map(|(title, url)| LinkButton { title: title.to_owned(), url: url.to_owned() })
    .collect()
}

// =============================================================================
// PARSING
// =============================================================================

fn query_pairs(query: &str) -> form_urlencoded::Parse<'_> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
}

fn split_pair(raw: &str) -> Option<(&str, &str)> {
    raw.split_once(PAIR_SEPARATOR)
}

/// Derive the launch buttons configured by `query`.
///
/// Invalid or malformed entries are dropped silently. The leading `?` is
/// optional.
#[must_use]
pub fn parse_buttons(query: &str) -> ButtonList {
    let mut singles = Vec::new();
    let mut bulk: Option<String> = None;

    for (key, value) in query_pairs(query) {
        match key.as_ref() {
            BTN_PARAM => singles.push(value.into_owned()),
            BULK_PARAM if bulk.is_none() => bulk = Some(value.into_owned()),
            _ => {}
        }
    }

    let from_singles = singles.iter().filter_map(|value| split_pair(value));
    let from_bulk = bulk
        .iter()
        .flat_map(|list| list.split(BULK_SEPARATOR))
        .filter_map(|item| split_pair(item.trim()));

    from_singles
        .chain(from_bulk)
        .filter_map(|(title, url)| LinkButton::new(title, url).ok())
        .collect()
}

/// Parsed buttons, or [`default_buttons`] when the query configures none.
#[must_use]
pub fn resolve_buttons(query: &str) -> ButtonList {
    let parsed = parse_buttons(query);
    if parsed.is_empty() { default_buttons() } else { parsed }
}

/// Initial memo text from the first `text` parameter. An empty value counts
/// as absent.
#[must_use]
pub fn parse_initial_text(query: &str) -> Option<String> {
    query_pairs(query)
        .find(|(key, _)| key == TEXT_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
#[path = "links_test.rs"]
mod tests;
