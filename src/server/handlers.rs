//! HTTP request handlers for the development server.
//!
//! # Endpoints
//!
//! - `GET /static/{*path}` - Compiled asset or static file
//! - `GET /favicon.ico` - `static/favicon.ico`
//! - `GET /robots.txt` - `static/robots.txt`
//! - anything else - Page rendered from the route manifest
//!
//! The dispatcher reads files, runs Tera and may make blocking CMS calls, so
//! every handler hands its work to the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::dispatcher::{Dispatcher, PageRequest, PageResponse};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

// =============================================================================
// Response Mapping
// =============================================================================

/// Every response from the development server is marked `no-cache` so that
/// edits show up on reload.
impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Run dispatcher work on the blocking pool.
///
/// A panic inside the task becomes a 500 instead of tearing down the
/// connection.
async fn run_blocking<F>(work: F) -> PageResponse
where
    F: FnOnce() -> PageResponse + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(response) => response,
        Err(e) => {
            error!(
                error_type = "task_failed",
                status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "Request task failed: {}",
                e
            );
            PageResponse::internal_error()
        }
    }
}

/// Percent-decode a request path, keeping it raw if it is not valid UTF-8.
fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Render a page for any path not claimed by another route.
pub async fn page_handler(State(state): State<AppState>, uri: Uri) -> PageResponse {
    let request = PageRequest::new(decode_path(uri.path()), uri.query().map(str::to_string));
    let dispatcher = Arc::clone(&state.dispatcher);
    run_blocking(move || dispatcher.dispatch(&request)).await
}

/// Serve `/static/{*path}`.
pub async fn static_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> PageResponse {
    let dispatcher = Arc::clone(&state.dispatcher);
    run_blocking(move || dispatcher.serve_static(&path)).await
}

/// Serve `/favicon.ico` from `static/`.
pub async fn favicon_handler(State(state): State<AppState>) -> PageResponse {
    let dispatcher = Arc::clone(&state.dispatcher);
    run_blocking(move || dispatcher.serve_static("favicon.ico")).await
}

/// Serve `/robots.txt` from `static/`.
pub async fn robots_handler(State(state): State<AppState>) -> PageResponse {
    let dispatcher = Arc::clone(&state.dispatcher);
    run_blocking(move || dispatcher.serve_static("robots.txt")).await
}

// =============================================================================
// Tests
// =============================================================================
