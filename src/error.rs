use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a project's `app.yaml`
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The file exists but could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML
    #[error("Cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The project file does not exist
    #[error("Project file not found: {0}")]
    NotFound(PathBuf),

    /// A key required by the current operation is absent
    #[error("{path} has no value for \"{key}\"")]
    MissingKey { path: PathBuf, key: &'static str },
}

/// Errors in a route rule such as `/blog/<int:id>`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Rules must be absolute
    #[error("Route rule must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    /// A `<` without a closing `>`
    #[error("Unclosed placeholder in route rule {0:?}")]
    UnclosedPlaceholder(String),

    /// Placeholder name is empty or not an identifier
    #[error("Invalid placeholder {placeholder:?} in route rule {rule:?}")]
    InvalidPlaceholder { rule: String, placeholder: String },

    /// Converter other than string/int/float/path/uuid/any
    #[error("Unknown converter {converter:?} in route rule {rule:?}")]
    UnknownConverter { rule: String, converter: String },

    /// The same placeholder name appears twice
    #[error("Duplicate placeholder {name:?} in route rule {rule:?}")]
    DuplicatePlaceholder { rule: String, name: String },

    /// The generated matcher failed to compile
    #[error("Route rule {rule:?} produced an invalid matcher: {message}")]
    Regex { rule: String, message: String },
}

/// Errors in the `routes` section of a manifest
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// `routes` is present but does not have the expected shape
    #[error("Invalid routes section: {0}")]
    Parse(String),

    /// A rule failed to parse
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// An integer rule other than 404
    #[error("Unsupported status rule {0} (only 404 is supported)")]
    UnsupportedStatus(u16),

    /// The manifest has no routes
    #[error("Manifest has no routes")]
    Empty,
}

/// Errors loading a single content file
///
/// These are never fatal: the dispatcher logs them and skips the file.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Cannot read content file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse content file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Extension other than .json, .yaml or .yml
    #[error("Unrecognized content file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The document parsed but is not a key/value mapping
    #[error("Content file {0} does not contain a mapping")]
    NotAMapping(PathBuf),
}

/// Errors that abort rendering a single request
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Template lookup, parse or render failure
    #[error("Template {name}: {message}")]
    Template { name: String, message: String },

    /// Reading a markdown template or static file failed
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors compiling a stylesheet or script source
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Cannot read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler binary could not be started
    #[error("Cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler ran but exited unsuccessfully
    #[error("{program} failed on {path} (exit status {status:?}): {stderr}")]
    CompilerFailed {
        program: String,
        path: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
}

/// Errors talking to the remote API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API answers 404 when the access key or application is unknown
    #[error("API returned 404 for {uri}; check api_access_key and api_secret_key in app.yaml")]
    BadCredentials { uri: String },

    /// Any other non-success status
    #[error("API returned HTTP {status} for {uri}: {body}")]
    Status { uri: String, status: u16, body: String },

    /// Connection, TLS or timeout failure
    #[error("Connection error: {0}")]
    Transport(String),

    /// The response body was not the expected JSON
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Errors preparing or performing an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("Cannot read {path}: {source}")]
    Package {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload or application config could not be serialized
    #[error("Cannot encode upload payload: {0}")]
    Encode(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
