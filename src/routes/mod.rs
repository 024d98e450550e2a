//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! JSON endpoints for the memo, the URL-configured buttons, and the builder
//! live under `/api`. Every other path falls through to the shell cache
//! controller, which fronts the upstream origin serving the page itself.

pub mod buttons;
pub mod builder;
pub mod memo;
pub mod shell;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// JSON error body shared by the API routes.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/memo", get(memo::load_memo).put(memo::edit_memo).delete(memo::clear_memo))
        .route("/api/buttons", get(buttons::resolve))
        .route(
            "/api/builder",
            get(builder::list_entries)
                .post(builder::add_entry)
                .delete(builder::reset),
        )
        .route("/api/builder/share", get(builder::share_url))
        .route("/api/builder/{index}", delete(builder::remove_entry))
        .route("/healthz", get(healthz))
        .fallback(shell::proxy)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
