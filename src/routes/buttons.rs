//! Launch buttons derived from the request's query string.

use axum::extract::RawQuery;
use axum::response::Json;

use crate::services::links::{self, ButtonList};

/// `GET /api/buttons?btn=..&buttons=..`: parsed buttons, or the defaults when
/// the query configures none.
pub async fn resolve(RawQuery(query): RawQuery) -> Json<ButtonList> {
    Json(links::resolve_buttons(query.as_deref().unwrap_or_default()))
}

#[cfg(test)]
#[path = "buttons_test.rs"]
mod tests;
