//! # hive-sdk
//!
//! Local development server and deployment tool for template-driven sites.
//!
//! A project is a directory with an `app.yaml` describing its routes and API
//! credentials, Tera templates, YAML/JSON content files and a `static/` tree.
//! The development server renders pages exactly as the hosted service would,
//! recompiles stylesheets and scripts as they change, and the upload command
//! publishes the project through the signed hosting API.
//!
//! ## Features
//!
//! - **Dynamic routing**: `app.yaml` is re-read on every request, so route
//!   edits apply without a restart
//! - **Asset pipeline**: Sass, Stylus, Less and CoffeeScript sources compiled
//!   by a background watcher into an in-memory cache
//! - **CMS helpers**: templates can query content types and entries from the
//!   hosting API
//! - **Signed uploads**: HMAC-SHA1 request signing for every API call
//!
//! ## Architecture
//!
//! - [`project`] - Project layout and `app.yaml`
//! - [`server`] - Route manifest, dispatcher and axum router
//! - [`assets`] - Asset cache, compilers and the polling watcher
//! - [`api`] - Request signing, API client, CMS queries and upload
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use hive_sdk::{AssetCache, Dispatcher, ProjectLayout, RouterConfig, create_router};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let dispatcher = Dispatcher::new(
//!         ProjectLayout::new("my-site"),
//!         AssetCache::new(),
//!         "https://api.markuphive.com",
//!     );
//!     let router = create_router(dispatcher, RouterConfig::default());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod project;
pub mod server;

// Re-export commonly used types
pub use api::{
    package_project, upload, ApiClient, ApiRequest, ApiResponse, CmsClient, EntryQuery,
    RequestSigner, UploadOutcome, UploadPayload, DEFAULT_API_ENDPOINT,
};
pub use assets::{
    AssetCache, AssetCompiler, AssetKind, AssetWatcher, CompiledAsset, CompilerCommands,
    ExternalCompiler, ScanReport, SourceDialect,
};
pub use config::{Cli, Command, ServeConfig, UploadConfig};
pub use error::{
    ApiError, AssetError, ContentError, DispatchError, ManifestError, PatternError, ProjectError,
    UploadError,
};
pub use project::{Credentials, ProjectFile, ProjectLayout, PROJECT_FILE};
pub use server::{
    create_router, AppState, Dispatcher, PageRequest, PageResponse, RouteManifest, RoutePattern,
    RouterConfig,
};
