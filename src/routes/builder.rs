//! Builder routes: edit the persisted button list and generate share URLs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::error;

use super::ErrorBody;
use crate::services::builder::BuilderError;
use crate::services::links::{ButtonList, LinkButton};
use crate::services::share;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Deserialize)]
pub struct NewEntry {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareParams {
    pub base: String,
    #[serde(default)]
    pub include_text: bool,
}

pub(crate) fn builder_error_to_status(err: &BuilderError) -> StatusCode {
    match err {
        BuilderError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BuilderError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        BuilderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: BuilderError) -> ApiError {
    let status = builder_error_to_status(&err);
    if status.is_server_error() {
        error!(error = %err, "builder storage failure");
    }
    let field = match &err {
        BuilderError::Validation(v) => Some(v.field().to_string()),
        _ => None,
    };
    (status, Json(ErrorBody { error: err.to_string(), field }))
}

/// `GET /api/builder`
pub async fn list_entries(State(state): State<AppState>) -> Json<ButtonList> {
    Json(state.builder.lock().await.list_entries().to_vec())
}

/// `POST /api/builder`: append an entry; returns the updated list.
pub async fn add_entry(
    State(state): State<AppState>,
    Json(entry): Json<NewEntry>,
) -> Result<(StatusCode, Json<ButtonList>), ApiError> {
    let mut builder = state.builder.lock().await;
    builder.add_entry(&entry.title, &entry.url).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(builder.list_entries().to_vec())))
}

/// `DELETE /api/builder/{index}`: remove one entry and return it.
pub async fn remove_entry(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<LinkButton>, ApiError> {
    let removed = state.builder.lock().await.remove_entry(index).await.map_err(api_error)?;
    Ok(Json(removed))
}

/// `DELETE /api/builder`: clear the list.
pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.builder.lock().await.reset().await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/builder/share?base=..&include_text=..`: share URL for the list,
/// optionally carrying the current memo text.
pub async fn share_url(State(state): State<AppState>, Query(params): Query<ShareParams>) -> String {
    let builder = state.builder.lock().await;
    if params.include_text {
        let text = state.memo.current();
        share::build_share_url(&params.base, Some(&text), builder.list_entries())
    } else {
        builder.build_share_url(&params.base)
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
