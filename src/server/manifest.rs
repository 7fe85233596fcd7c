//! The `routes` section of `app.yaml`.
//!
//! ```yaml
//! routes:
//!   - rule: /
//!     template: index.html
//!     content: home.yaml
//!   - rule: /blog/<slug>
//!     template: post.html
//!     content: [site.yaml, posts.json]
//!   - rule: 404
//!     template: not_found.html
//! ```
//!
//! A manifest is built fresh for every request and dropped with it.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml_ng::Value;

use crate::error::ManifestError;

use super::pattern::RoutePattern;
use super::welcome::WELCOME_MANIFEST;

// =============================================================================
// Types
// =============================================================================

/// What a route entry matches.
#[derive(Debug, Clone)]
pub enum RouteRule {
    /// A URI pattern
    Pattern(RoutePattern),

    /// The `rule: 404` entry used when nothing else matches
    NotFound,
}

/// One entry of the `routes` list.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub rule: RouteRule,

    /// Template path relative to `templates/`
    pub template: String,

    /// Content file paths relative to `content/`, in merge order
    pub content: Vec<String>,
}

/// A successful pattern match.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,

    /// Placeholder values captured from the path
    pub placeholders: BTreeMap<String, String>,
}

/// An ordered list of routes.
#[derive(Debug, Clone)]
pub struct RouteManifest {
    entries: Vec<RouteEntry>,
    welcome: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Status(u16),
    Pattern(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawRoute {
    rule: RawRule,
    template: String,
    #[serde(default)]
    content: Option<OneOrMany>,
}

// =============================================================================
// Loading
// =============================================================================

impl RouteManifest {
    /// Read the manifest out of a parsed `app.yaml` document.
    ///
    /// Returns `Ok(None)` when the document has no usable routes (null
    /// document, no `routes` key, or an empty list), in which case the caller
    /// substitutes [`RouteManifest::welcome`].
    pub fn from_document(document: &Value) -> Result<Option<Self>, ManifestError> {
        let Some(routes) = document.get("routes") else {
            return Ok(None);
        };
        if routes.is_null() {
            return Ok(None);
        }

        let raw: Vec<RawRoute> = serde_yaml_ng::from_value(routes.clone())
            .map_err(|e| ManifestError::Parse(e.to_string()))?;
        if raw.is_empty() {
            return Ok(None);
        }

        let entries = raw
            .into_iter()
            .map(RouteEntry::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            entries,
            welcome: false,
        }))
    }

    /// The bundled welcome manifest.
    pub fn welcome() -> Result<Self, ManifestError> {
        let document: Value = serde_yaml_ng::from_str(WELCOME_MANIFEST)
            .map_err(|e| ManifestError::Parse(e.to_string()))?;
        let mut manifest = Self::from_document(&document)?.ok_or(ManifestError::Empty)?;
        manifest.welcome = true;
        Ok(manifest)
    }

    /// Whether this is the bundled welcome manifest.
    pub fn is_welcome(&self) -> bool {
        self.welcome
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// First pattern entry matching `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|entry| match &entry.rule {
            RouteRule::Pattern(pattern) => pattern.match_path(path).map(|placeholders| RouteMatch {
                entry,
                placeholders,
            }),
            RouteRule::NotFound => None,
        })
    }

    /// The first `rule: 404` entry, if any.
    pub fn not_found(&self) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|entry| matches!(entry.rule, RouteRule::NotFound))
    }
}

impl RouteEntry {
    fn from_raw(raw: RawRoute) -> Result<Self, ManifestError> {
        let rule = match raw.rule {
            RawRule::Status(404) => RouteRule::NotFound,
            RawRule::Status(other) => return Err(ManifestError::UnsupportedStatus(other)),
            RawRule::Pattern(rule) => RouteRule::Pattern(RoutePattern::parse(&rule)?),
        };
        let content = match raw.content {
            None => Vec::new(),
            Some(OneOrMany::One(file)) => vec![file],
            Some(OneOrMany::Many(files)) => files,
        };
        Ok(Self {
            rule,
            template: raw.template,
            content,
        })
    }

    /// Whether the template is rendered as markdown.
    pub fn is_markdown(&self) -> bool {
        self.template.ends_with(".md")
    }
}

// =============================================================================
// Tests
// =============================================================================
