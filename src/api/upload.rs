//! Site packaging and upload.
//!
//! The upload is a single signed `PUT /v0/application/{name}/` whose JSON body
//! carries every deployable file base64-encoded:
//!
//! ```json
//! {
//!   "templates": { "index.html": "PGh0bWw+..." },
//!   "content":   { "home.yaml": "dGl0bGU6..." },
//!   "static":    { "css/site.scss": "Ym9keSB7..." },
//!   "application_config": "eyJhcHBsaWNhdGlvbl9uYW1lIjoi..."
//! }
//! ```
//!
//! Files whose names start with `.`, `#` or `_` are editor scratch files,
//! drafts or partials and are never uploaded.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::UploadError;
use crate::project::{yaml_to_json, ProjectFile, ProjectLayout};

use super::client::{ApiClient, ApiRequest, ApiResponse};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// First characters that exclude a file from upload.
const EXCLUDED_PREFIXES: [char; 3] = ['.', '#', '_'];

// =============================================================================
// Payload
// =============================================================================

/// The JSON document sent to the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadPayload {
    pub templates: BTreeMap<String, String>,
    pub content: BTreeMap<String, String>,
    #[serde(rename = "static")]
    pub static_files: BTreeMap<String, String>,
    pub application_config: String,
}

impl UploadPayload {
    /// Total number of packaged files.
    pub fn file_count(&self) -> usize {
        self.templates.len() + self.content.len() + self.static_files.len()
    }

    pub fn to_json(&self) -> Result<Bytes, UploadError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| UploadError::Encode(e.to_string()))
    }
}

/// Whether a file name is excluded from upload.
pub fn is_excluded(file_name: &str) -> bool {
    file_name.starts_with(EXCLUDED_PREFIXES)
}

/// Package a project's templates, content and static files.
pub fn package_project(
    layout: &ProjectLayout,
    project: &ProjectFile,
) -> Result<UploadPayload, UploadError> {
    let config_json = serde_json::to_vec(&yaml_to_json(project.document().clone()))
        .map_err(|e| UploadError::Encode(e.to_string()))?;

    let payload = UploadPayload {
        templates: collect_section(&layout.templates_dir())?,
        content: collect_section(&layout.content_dir())?,
        static_files: collect_section(&layout.static_dir())?,
        application_config: BASE64.encode(config_json),
    };

    info!(
        templates = payload.templates.len(),
        content = payload.content.len(),
        static_files = payload.static_files.len(),
        "Packaged project"
    );

    Ok(payload)
}

/// Collect every uploadable file below `dir`, keyed by `/`-separated relative
/// path. A missing directory yields an empty section.
fn collect_section(dir: &Path) -> Result<BTreeMap<String, String>, UploadError> {
    let mut files = BTreeMap::new();
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => collect_into(dir, "", &mut files)?,
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(UploadError::Package {
                path: dir.to_path_buf(),
                source,
            })
        }
    }
    Ok(files)
}

fn collect_into(
    dir: &Path,
    prefix: &str,
    files: &mut BTreeMap<String, String>,
) -> Result<(), UploadError> {
    let package_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| UploadError::Package { path, source }
    };

    let entries = fs::read_dir(dir).map_err(package_err(dir))?;
    for entry in entries {
        let entry = entry.map_err(package_err(dir))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().map_err(package_err(&path))?;
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        if file_type.is_dir() {
            if name.starts_with('.') {
                debug!(path = %path.display(), "Skipping hidden directory");
                continue;
            }
            collect_into(&path, &key, files)?;
        } else if is_excluded(&name) {
            debug!(path = %path.display(), "Skipping excluded file");
        } else {
            let data = fs::read(&path).map_err(package_err(&path))?;
            files.insert(key, BASE64.encode(data));
        }
    }
    Ok(())
}

// =============================================================================
// Outcome
// =============================================================================

/// What the API said about an upload that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// `success: true`; the site is live at `url`
    Published { url: String },

    /// `success: false`, with the API's error messages
    Rejected { errors: Vec<String> },

    /// 2xx response whose body could not be read as an outcome
    Unconfirmed { body: String },
}

/// Public URL of a deployed application.
pub fn site_url(application_name: &str) -> String {
    format!("http://{}.app.markuphive.com/", application_name)
}

/// Interpret a 2xx upload response.
pub fn interpret_response(application_name: &str, response: &ApiResponse) -> UploadOutcome {
    let unconfirmed = || UploadOutcome::Unconfirmed {
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    let Ok(Value::Object(map)) = response.json() else {
        return unconfirmed();
    };

    match map.get("success").and_then(Value::as_bool) {
        Some(true) => UploadOutcome::Published {
            url: site_url(application_name),
        },
        Some(false) => UploadOutcome::Rejected {
            errors: error_messages(map.get("error")),
        },
        None => unconfirmed(),
    }
}

fn error_messages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

/// Send a packaged payload and interpret the response.
pub fn upload(client: &ApiClient, payload: &UploadPayload) -> Result<UploadOutcome, UploadError> {
    let body = payload.to_json()?;
    info!(
        files = payload.file_count(),
        bytes = body.len(),
        application = client.application_name(),
        "Uploading"
    );

    let response = client.call(&ApiRequest::PutApplication { payload: body })?;
    debug!(
        status = response.status,
        body = %String::from_utf8_lossy(&response.body),
        "Upload response"
    );

    Ok(interpret_response(client.application_name(), &response))
}

// =============================================================================
// Tests
// =============================================================================
