//! Fallback route: every non-API request goes through the shell controller.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::warn;
use url::Url;

use crate::shell::{FetchOutcome, NetworkError, ShellRequest, ShellResponse};
use crate::state::AppState;

pub(crate) fn network_error_to_status(err: &NetworkError) -> StatusCode {
    match err {
        NetworkError::ClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        NetworkError::Request { .. } | NetworkError::Body { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn into_response(shell_response: ShellResponse) -> Response {
    let status = StatusCode::from_u16(shell_response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, shell_response.body).into_response();
    if let Some(value) = shell_response
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

/// Upstream URL for `uri`: the shell origin with the request's path and
/// query. Any scheme or authority in the request target is ignored.
pub(crate) fn origin_url(origin: &Url, uri: &Uri) -> Url {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url.set_fragment(None);
    url
}

/// Proxy the request to the shell origin, cache-first for same-origin GETs.
pub async fn proxy(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let Some(shell) = state.shell.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Only same-origin requests ever reach the upstream fetcher.
    let url = origin_url(shell.origin(), &uri);
    if !shell.is_same_origin(&url) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let request = ShellRequest {
        method,
        url,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: body.to_vec(),
    };

    let result = match shell.handle_fetch(&request).await {
        Ok(FetchOutcome::Cached(response) | FetchOutcome::Network(response)) => Ok(response),
        Ok(FetchOutcome::Passthrough) => shell.fetcher().fetch(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => into_response(response),
        Err(e) => {
            warn!(url = %request.url, error = %e, "shell request failed");
            network_error_to_status(&e).into_response()
        }
    }
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
