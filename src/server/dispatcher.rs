//! Per-request page dispatch.
//!
//! Nothing about the site is cached between requests except compiled
//! assets. Each page request:
//!
//! 1. re-reads `app.yaml` (falling back to the welcome manifest),
//! 2. resolves the path to a route entry (or the `404` entry),
//! 3. loads every template into a fresh Tera instance,
//! 4. merges the entry's content files and renders.
//!
//! All of this is blocking work and runs on the blocking pool; see
//! [`super::handlers`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use tera::{Context, Template, Tera};
use tracing::{debug, error, warn};

use crate::api::CmsClient;
use crate::assets::{AssetCache, SourceDialect};
use crate::error::DispatchError;
use crate::project::{ProjectFile, ProjectLayout};

use super::content::merge_content;
use super::helpers::{register_helpers, render_markdown, RequestHelpers};
use super::manifest::{RouteEntry, RouteManifest};
use super::welcome::{WELCOME_TEMPLATE, WELCOME_TEMPLATE_NAME};

/// Value of the `deployment` template variable.
pub const DEPLOYMENT: &str = "sdk";

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

// =============================================================================
// Request / Response
// =============================================================================

/// A page request, path already percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: String,

    /// Raw query string, without the `?`
    pub query: Option<String>,
}

impl PageRequest {
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }
}

/// A finished response body with its status and content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl PageResponse {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, TEXT, "Not Found")
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, TEXT, "Internal Server Error")
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Renders pages and serves static files for one project.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    layout: ProjectLayout,
    assets: AssetCache,
    api_endpoint: String,
}

impl Dispatcher {
    pub fn new(layout: ProjectLayout, assets: AssetCache, api_endpoint: impl Into<String>) -> Self {
        Self {
            layout,
            assets,
            api_endpoint: api_endpoint.into(),
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Render the page for `request`.
    ///
    /// Never fails: errors are logged and turned into a 500 response.
    pub fn dispatch(&self, request: &PageRequest) -> PageResponse {
        match self.try_dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                error!(
                    path = %request.path,
                    error = %error_chain(&e),
                    "Page dispatch failed"
                );
                PageResponse::internal_error()
            }
        }
    }

    /// Load the current manifest and project file from disk.
    pub fn load_manifest(&self) -> Result<(RouteManifest, Option<ProjectFile>), DispatchError> {
        let project = ProjectFile::load(&self.layout)?;
        let manifest = match &project {
            Some(project) => RouteManifest::from_document(project.document())?,
            None => None,
        };
        let manifest = match manifest {
            Some(manifest) => manifest,
            None => {
                debug!("No routes in project file; serving welcome site");
                RouteManifest::welcome()?
            }
        };
        Ok((manifest, project))
    }

    fn try_dispatch(&self, request: &PageRequest) -> Result<PageResponse, DispatchError> {
        let (manifest, project) = self.load_manifest()?;

        let (entry, placeholders, status) = match manifest.resolve(&request.path) {
            Some(matched) => (matched.entry, matched.placeholders, StatusCode::OK),
            None => match manifest.not_found() {
                Some(entry) => (entry, BTreeMap::new(), StatusCode::NOT_FOUND),
                None => {
                    debug!(path = %request.path, "No route matched");
                    return Ok(PageResponse::not_found());
                }
            },
        };

        debug!(
            path = %request.path,
            template = %entry.template,
            status = status.as_u16(),
            "Resolved route"
        );

        if entry.is_markdown() {
            return self.render_markdown_page(entry, status);
        }

        let mut tera = if manifest.is_welcome() {
            welcome_tera()?
        } else {
            self.load_templates()?
        };

        let helpers = RequestHelpers::new(&request.path, request.query.as_deref())
            .with_placeholders(placeholders);
        let cms = CmsClient::new(
            project.as_ref().and_then(ProjectFile::credentials),
            self.api_endpoint.as_str(),
        );
        register_helpers(&mut tera, Arc::new(helpers), Arc::new(cms));

        let content = merge_content(&self.layout.content_dir(), &entry.content);
        let mut context = Context::new();
        context.insert("content", &Value::Object(content));
        context.insert("deployment", DEPLOYMENT);

        let body = tera
            .render(&entry.template, &context)
            .map_err(|e| DispatchError::Template {
                name: entry.template.clone(),
                message: error_chain(&e),
            })?;

        Ok(PageResponse::new(
            status,
            content_type_for(Path::new(&entry.template)),
            body,
        ))
    }

    fn render_markdown_page(
        &self,
        entry: &RouteEntry,
        status: StatusCode,
    ) -> Result<PageResponse, DispatchError> {
        let path = self.layout.templates_dir().join(&entry.template);
        let text = fs::read_to_string(&path).map_err(|source| DispatchError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(PageResponse::new(status, HTML, render_markdown(&text)))
    }

    /// Load every non-markdown file under `templates/` into a fresh Tera.
    ///
    /// Files that are not UTF-8 text or do not parse are skipped, along with
    /// anything that extends or imports them, so one broken file only
    /// breaks the pages that use it.
    fn load_templates(&self) -> Result<Tera, DispatchError> {
        let dir = self.layout.templates_dir();
        let mut files = Vec::new();
        collect_templates(&dir, &dir, &mut files)?;

        let mut parsed = BTreeMap::new();
        for (path, name) in files {
            let Some(name) = name else { continue };
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    debug!(template = %name, error = %e, "Skipping unreadable template");
                    continue;
                }
            };
            match Template::new(&name, None, &source) {
                Ok(template) => {
                    parsed.insert(name, (source, template));
                }
                Err(e) => warn!(
                    template = %name,
                    error = %error_chain(&e),
                    "Skipping template that does not parse"
                ),
            }
        }

        loop {
            let orphaned: Vec<String> = parsed
                .iter()
                .filter(|(_, (_, template))| {
                    template
                        .parent
                        .iter()
                        .chain(template.imported_macro_files.iter().map(|(file, _)| file))
                        .any(|dependency| !parsed.contains_key(dependency))
                })
                .map(|(name, _)| name.clone())
                .collect();
            if orphaned.is_empty() {
                break;
            }
            for name in orphaned {
                warn!(template = %name, "Skipping template whose parent or macros are missing");
                parsed.remove(&name);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(
            parsed
                .into_iter()
                .map(|(name, (source, _))| (name, source)),
        )
        .map_err(|e| DispatchError::Template {
            name: dir.display().to_string(),
            message: error_chain(&e),
        })?;
        Ok(tera)
    }

    // =========================================================================
    // Static Files
    // =========================================================================

    /// Serve `rel` (relative to `static/`, already decoded).
    ///
    /// Compiled assets come from the cache. Recognized sources under the
    /// watched directories are only ever served from the cache; anything
    /// else is read from disk.
    pub fn serve_static(&self, rel: &str) -> PageResponse {
        let Some(rel) = sanitize_relative(rel) else {
            debug!(path = %rel, "Rejected static path");
            return PageResponse::not_found();
        };
        let full = self.layout.static_dir().join(&rel);

        if let Some(asset) = self.assets.lookup(&full) {
            return PageResponse::new(StatusCode::OK, asset.kind.content_type(), asset.data.clone());
        }

        let watched = full.starts_with(self.layout.stylesheet_dir())
            || full.starts_with(self.layout.script_dir());
        if watched && SourceDialect::from_path(&full).is_some() {
            debug!(path = %full.display(), "Asset not compiled (yet)");
            return PageResponse::not_found();
        }

        match fs::read(&full) {
            Ok(data) => PageResponse::new(StatusCode::OK, content_type_for(&full), data),
            Err(e) if e.kind() == ErrorKind::NotFound => PageResponse::not_found(),
            Err(e) if full.is_dir() => {
                debug!(path = %full.display(), error = %e, "Static path is a directory");
                PageResponse::not_found()
            }
            Err(e) => {
                warn!(path = %full.display(), error = %e, "Cannot read static file");
                PageResponse::internal_error()
            }
        }
    }
}

fn welcome_tera() -> Result<Tera, DispatchError> {
    let mut tera = Tera::default();
    tera.add_raw_template(WELCOME_TEMPLATE_NAME, WELCOME_TEMPLATE)
        .map_err(|e| DispatchError::Template {
            name: WELCOME_TEMPLATE_NAME.to_string(),
            message: error_chain(&e),
        })?;
    Ok(tera)
}

/// Collect `(path, name)` pairs for every template below `dir`, named by
/// their `/`-separated path relative to `root`. Markdown and hidden files
/// are skipped.
fn collect_templates(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(PathBuf, Option<String>)>,
) -> Result<(), DispatchError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| DispatchError::Io { path, source }
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(dir)(e)),
    };

    for entry in entries {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type().map_err(io_err(&path))?.is_dir() {
            collect_templates(root, &path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) != Some("md") {
            let name = path
                .strip_prefix(root)
                .unwrap_or(path.as_path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((path, Some(name)));
        }
    }
    Ok(())
}

/// Normalize a request-relative path, rejecting anything that could escape
/// the static directory.
fn sanitize_relative(rel: &str) -> Option<PathBuf> {
    if rel.is_empty() || rel.contains('\\') || rel.contains('\0') {
        return None;
    }
    let mut clean = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") | Some("htm") => HTML,
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => TEXT,
        Some("csv") => "text/csv; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}

// =============================================================================
// Tests
// =============================================================================
