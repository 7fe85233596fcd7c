//! Stylesheet and script compilation for the development server.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  asset-watcher thread                                     │
//! │                                                           │
//! │  ┌────────────────┐  new/changed   ┌──────────────────┐   │
//! │  │  AssetWatcher  │───────────────▶│  AssetCompiler   │   │
//! │  │ (poll css/js)  │                │ (sass, stylus,   │   │
//! │  └───────┬────────┘                │  lessc, coffee)  │   │
//! │          │ store                   └──────────────────┘   │
//! └──────────┼────────────────────────────────────────────────┘
//!            ▼
//!    ┌────────────────┐   lookup (read-only)   ┌─────────────┐
//!    │   AssetCache   │◀───────────────────────│  dispatcher │
//!    │ (Arc snapshots)│                        └─────────────┘
//!    └────────────────┘
//! ```

pub mod cache;
pub mod compiler;
pub mod watcher;

pub use cache::{AssetCache, AssetKind, CompiledAsset};
pub use compiler::{AssetCompiler, CompilerCommands, ExternalCompiler, SourceDialect};
pub use watcher::{AssetWatcher, ScanReport, WatchRoot, DEFAULT_POLL_INTERVAL};
