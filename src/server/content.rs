//! Content files bound into templates as `content`.
//!
//! A route lists content files relative to `content/`. Each file must hold
//! a key/value mapping; the mappings are merged in list order so later files
//! override earlier keys. A file that cannot be loaded is logged and skipped
//! and never fails the request.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ContentError;
use crate::project::yaml_to_json;

/// Load and merge `files` (relative to `content_dir`) into one mapping.
pub fn merge_content(content_dir: &Path, files: &[String]) -> Map<String, Value> {
    let mut merged = Map::new();
    for file in files {
        let path = content_dir.join(file);
        match load_content_file(&path) {
            Ok(Some(map)) => merged.extend(map),
            Ok(None) => {}
            Err(e @ ContentError::UnsupportedFormat(_)) => {
                info!(error = %e, "Skipping content file");
            }
            Err(e) => {
                warn!(error = %e, "Skipping content file");
            }
        }
    }
    merged
}

/// Load one content file.
///
/// `.json` is parsed as JSON, `.yaml`/`.yml` as YAML. Returns `Ok(None)` for
/// an empty YAML document.
pub fn load_content_file(path: &Path) -> Result<Option<Map<String, Value>>, ContentError> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        Some("yaml") | Some("yml") => Format::Yaml,
        _ => return Err(ContentError::UnsupportedFormat(path.to_path_buf())),
    };

    let text = fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = match format {
        Format::Json => serde_json::from_str(&text).map_err(|e| parse_error(path, e))?,
        Format::Yaml if text.trim().is_empty() => return Ok(None),
        Format::Yaml => yaml_to_json(
            serde_yaml_ng::from_str(&text).map_err(|e| parse_error(path, e))?,
        ),
    };

    match value {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        _ => Err(ContentError::NotAMapping(path.to_path_buf())),
    }
}

enum Format {
    Json,
    Yaml,
}

fn parse_error(path: &Path, e: impl std::fmt::Display) -> ContentError {
    ContentError::Parse {
        path: PathBuf::from(path),
        message: e.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
