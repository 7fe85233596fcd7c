//! Functions and filters available to every page template.
//!
//! | Helper                                   | Returns                           |
//! |------------------------------------------|-----------------------------------|
//! | `get(name="q")`                          | first query value or `""`         |
//! | `get(name="q", default="x")`             | first query value or `"x"`        |
//! | `get_list(name="tag")`                   | every value of a query parameter  |
//! | `path()`                                 | the request path                  |
//! | `path(index=0)`                          | a path segment or `""`            |
//! | `path(name="slug")`                      | a rule placeholder or `""`        |
//! | `static_url(path="css/site.css")`        | `/static/css/site.css`            |
//! | `cms_content_types()`                    | content types, or `null`          |
//! | `cms_entries(type="blog", page=0, ...)`  | a page of entries, or `null`      |
//! | `text \| markdown`                       | rendered HTML (not escaped)       |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pulldown_cmark::{html::push_html, Options, Parser};
use tera::{Tera, Value};

use crate::api::{CmsClient, EntryQuery};

// =============================================================================
// Request Helpers
// =============================================================================

/// Per-request data behind the `get` and `path` helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHelpers {
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    placeholders: BTreeMap<String, String>,
}

impl RequestHelpers {
    /// Build helpers for a decoded path and raw query string.
    pub fn new(path: &str, query: Option<&str>) -> Self {
        let segments = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let query = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path: path.to_string(),
            segments,
            query,
            placeholders: BTreeMap::new(),
        }
    }

    /// Attach the placeholders captured by the matched rule.
    pub fn with_placeholders(mut self, placeholders: BTreeMap<String, String>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Zero-based path segment.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn placeholder(&self, name: &str) -> Option<&str> {
        self.placeholders.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a query parameter, in request order.
    pub fn get_list(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

// =============================================================================
// Markdown
// =============================================================================

/// Render markdown to HTML with tables, strikethrough and task lists.
pub fn render_markdown(text: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options);
    let mut html = String::with_capacity(text.len() * 3 / 2);
    push_html(&mut html, parser);
    html
}

struct MarkdownFilter;

impl tera::Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value {
            Value::String(text) => Ok(Value::String(render_markdown(text))),
            Value::Null => Ok(Value::String(String::new())),
            other => Err(tera::Error::msg(format!(
                "markdown filter expects a string, got {}",
                other
            ))),
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// URL of a file under `static/`.
pub fn static_url(path: &str) -> String {
    format!("/static/{}", path.trim_start_matches('/'))
}

// =============================================================================
// Registration
// =============================================================================

/// Register every helper on `tera` for one request.
pub fn register_helpers(tera: &mut Tera, request: Arc<RequestHelpers>, cms: Arc<CmsClient>) {
    let req = Arc::clone(&request);
    tera.register_function("get", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let name = required_str(args, "get", "name")?;
        let value = req
            .get(name)
            .or_else(|| args.get("default").and_then(Value::as_str))
            .unwrap_or_default();
        Ok(Value::String(value.to_string()))
    });

    let req = Arc::clone(&request);
    tera.register_function("get_list", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let name = required_str(args, "get_list", "name")?;
        Ok(Value::from(req.get_list(name)))
    });

    let req = request;
    tera.register_function("path", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let value = if let Some(index) = args.get("index") {
            let index = index
                .as_u64()
                .ok_or_else(|| tera::Error::msg("path(index=...) expects a non-negative integer"))?;
            req.segment(index as usize).unwrap_or_default()
        } else if let Some(name) = args.get("name") {
            let name = name
                .as_str()
                .ok_or_else(|| tera::Error::msg("path(name=...) expects a string"))?;
            req.placeholder(name).unwrap_or_default()
        } else {
            req.path()
        };
        Ok(Value::String(value.to_string()))
    });

    tera.register_function("static_url", |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let path = required_str(args, "static_url", "path")?;
        Ok(Value::String(static_url(path)))
    });

    let client = Arc::clone(&cms);
    tera.register_function("cms_content_types", move |_: &HashMap<String, Value>| -> tera::Result<Value> {
        Ok(client.content_types().unwrap_or(Value::Null))
    });

    let client = cms;
    tera.register_function("cms_entries", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
        let query = entry_query(args)?;
        Ok(client.entries(query).unwrap_or(Value::Null))
    });

    tera.register_filter("markdown", MarkdownFilter);
}

fn required_str<'a>(
    args: &'a HashMap<String, Value>,
    function: &str,
    key: &str,
) -> tera::Result<&'a str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        tera::Error::msg(format!(
            "{}() requires a string '{}' argument",
            function, key
        ))
    })
}

/// Build an [`EntryQuery`] from `cms_entries` arguments.
///
/// `tags` and `timestamp` accept either a single string or a list.
fn entry_query(args: &HashMap<String, Value>) -> tera::Result<EntryQuery> {
    let mut query = EntryQuery::new(required_str(args, "cms_entries", "type")?);

    if let Some(page) = args.get("page") {
        query.page = as_u32(page, "page")?;
    }
    if let Some(limit) = args.get("limit") {
        query.limit = as_u32(limit, "limit")?;
    }
    query.tags = string_list(args.get("tags"));
    query.timestamp = string_list(args.get("timestamp"));

    Ok(query)
}

fn as_u32(value: &Value, key: &str) -> tera::Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| tera::Error::msg(format!("cms_entries: '{}' must be a non-negative integer", key)))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

// =============================================================================
// Tests
// =============================================================================
