//! Development HTTP server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           HTTP Layer                             │
//! │   routes (axum Router)  ──▶  handlers (spawn_blocking)           │
//! └──────────────────────────────────┬───────────────────────────────┘
//!                                    ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Dispatcher                             │
//! │                                                                  │
//! │  app.yaml ─▶ manifest ─▶ pattern match ─▶ template + content     │
//! │                 │                              │                 │
//! │           (welcome if                   ┌──────┴──────┐          │
//! │            no routes)                   │   helpers   │          │
//! │                                         │ (get, path, │          │
//! │  /static ─▶ AssetCache ─▶ disk          │  cms, ...)  │          │
//! │                                         └─────────────┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod content;
pub mod dispatcher;
pub mod handlers;
pub mod helpers;
pub mod manifest;
pub mod pattern;
pub mod routes;
pub mod welcome;

pub use content::{load_content_file, merge_content};
pub use dispatcher::{content_type_for, Dispatcher, PageRequest, PageResponse, DEPLOYMENT};
pub use handlers::{favicon_handler, page_handler, robots_handler, static_handler, AppState};
pub use helpers::{register_helpers, render_markdown, static_url, RequestHelpers};
pub use manifest::{RouteEntry, RouteManifest, RouteMatch, RouteRule};
pub use pattern::RoutePattern;
pub use routes::{create_router, RouterConfig};
