//! Memo routes.

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoBody {
    pub text: String,
}

/// `GET /api/memo`: load the memo; a `text` parameter seeds an empty store.
pub async fn load_memo(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<Json<MemoBody>, StatusCode> {
    let text = state
        .memo
        .load(query.as_deref().unwrap_or_default())
        .await
        .map_err(|e| {
            error!(error = %e, "memo load failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(MemoBody { text }))
}

/// `PUT /api/memo`: record an edit; the write happens after the debounce.
pub async fn edit_memo(State(state): State<AppState>, Json(body): Json<MemoBody>) -> StatusCode {
    state.memo.edit(body.text);
    StatusCode::ACCEPTED
}

/// `DELETE /api/memo`: clear the memo immediately.
pub async fn clear_memo(State(state): State<AppState>) -> StatusCode {
    match state.memo.clear().await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            error!(error = %e, "memo clear failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "memo_test.rs"]
mod tests;
