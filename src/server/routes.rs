//! Router configuration for the development server.
//!
//! # Route Structure
//!
//! ```text
//! /static/{*path}     - compiled assets and static files
//! /favicon.ico        - static/favicon.ico
//! /robots.txt         - static/robots.txt
//! (fallback)          - pages from app.yaml routes
//! ```
//!
//! Page routes are not registered with axum: the manifest is re-read on
//! every request, so the fallback handler does its own matching.
//!
//! # Example
//!
//! ```ignore
//! use hive_sdk::assets::AssetCache;
//! use hive_sdk::project::ProjectLayout;
//! use hive_sdk::server::{create_router, Dispatcher, RouterConfig};
//!
//! let dispatcher = Dispatcher::new(
//!     ProjectLayout::new("my-site"),
//!     AssetCache::new(),
//!     "https://api.markuphive.com",
//! );
//! let router = create_router(dispatcher, RouterConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::dispatcher::Dispatcher;
use super::handlers::{favicon_handler, page_handler, robots_handler, static_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the development server router.
pub fn create_router(dispatcher: Dispatcher, config: RouterConfig) -> Router {
    let router = Router::new()
        .route("/static/{*path}", get(static_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/robots.txt", get(robots_handler))
        .fallback(page_handler)
        .with_state(AppState::new(dispatcher));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
