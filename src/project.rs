//! Project layout and the `app.yaml` project file.
//!
//! A project is a directory with this shape:
//!
//! ```text
//! my-site/
//! ├── app.yaml        routes + API credentials
//! ├── templates/      Tera templates and markdown pages
//! ├── content/        JSON / YAML data merged into templates
//! └── static/
//!     ├── css/        stylesheets (css, scss, sass, styl, less)
//!     └── js/         scripts (js, coffee)
//! ```
//!
//! `app.yaml` is read fresh for every request and every upload; nothing here
//! is cached.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml_ng::Value;

use crate::error::ProjectError;

/// File name of the project manifest.
pub const PROJECT_FILE: &str = "app.yaml";

// =============================================================================
// Layout
// =============================================================================

/// Well-known paths inside a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at `root`.
    ///
    /// Relative roots are resolved against the current directory so that
    /// asset cache keys are always absolute.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_file(&self) -> PathBuf {
        self.root.join(PROJECT_FILE)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join("static")
    }

    /// Directory watched for stylesheet sources.
    pub fn stylesheet_dir(&self) -> PathBuf {
        self.static_dir().join("css")
    }

    /// Directory watched for script sources.
    pub fn script_dir(&self) -> PathBuf {
        self.static_dir().join("js")
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Credentials for the remote API, taken from `app.yaml`.
///
/// Never written anywhere; only used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub application_name: String,
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("application_name", &self.application_name)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CredentialFields {
    application_name: Option<String>,
    api_access_key: Option<String>,
    api_secret_key: Option<String>,
}

// =============================================================================
// Project File
// =============================================================================

/// A parsed `app.yaml`.
///
/// The raw YAML document is kept so that it can be sent as JSON for the
/// application config during upload, and so the route manifest can be read
/// from it.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    path: PathBuf,
    document: Value,
}

impl ProjectFile {
    /// Load the project file for `layout`.
    ///
    /// Returns `Ok(None)` when the file does not exist. An empty file loads
    /// as a null document.
    pub fn load(layout: &ProjectLayout) -> Result<Option<Self>, ProjectError> {
        let path = layout.project_file();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ProjectError::Read { path, source }),
        };
        Self::parse(path, &text).map(Some)
    }

    /// Load the project file, treating absence as an error.
    pub fn require(layout: &ProjectLayout) -> Result<Self, ProjectError> {
        Self::load(layout)?.ok_or_else(|| ProjectError::NotFound(layout.project_file()))
    }

    /// Parse project file text. `path` is only used in error messages.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, ProjectError> {
        let path = path.into();
        let document = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml_ng::from_str(text).map_err(|e| ProjectError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?
        };
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw YAML document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Credentials if all three keys are present, `None` otherwise.
    pub fn credentials(&self) -> Option<Credentials> {
        self.require_credentials().ok()
    }

    /// Credentials, naming the first missing key on failure.
    pub fn require_credentials(&self) -> Result<Credentials, ProjectError> {
        let fields: CredentialFields = if self.document.is_mapping() {
            serde_yaml_ng::from_value(self.document.clone()).map_err(|e| {
                ProjectError::Parse {
                    path: self.path.clone(),
                    message: e.to_string(),
                }
            })?
        } else {
            CredentialFields::default()
        };

        let missing = |key: &'static str| ProjectError::MissingKey {
            path: self.path.clone(),
            key,
        };

        Ok(Credentials {
            application_name: fields
                .application_name
                .ok_or_else(|| missing("application_name"))?,
            access_key: fields
                .api_access_key
                .ok_or_else(|| missing("api_access_key"))?,
            secret_key: fields
                .api_secret_key
                .ok_or_else(|| missing("api_secret_key"))?,
        })
    }
}

/// Convert a YAML value to JSON.
///
/// YAML allows any scalar as a mapping key; JSON does not, so keys are
/// stringified (`2019` becomes `"2019"`, `true` becomes `"true"`, `~`
/// becomes `"null"`). Tags are dropped and non-finite floats become null.
pub fn yaml_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
        }
        Value::String(s) => serde_json::Value::String(s),
        Value::Sequence(items) => {
            serde_json::Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        Value::Mapping(mapping) => serde_json::Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => yaml_key(tagged.value),
        other => yaml_to_json(other).to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
