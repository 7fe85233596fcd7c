//! Route rule matching.
//!
//! Rules are URI paths with typed placeholders:
//!
//! ```text
//! /blog/<slug>               string (default): one segment, no '/'
//! /post/<int:id>             digits
//! /price/<float:amount>      digits '.' digits
//! /files/<path:rest>         anything, including '/'
//! /item/<uuid:id>            8-4-4-4-12 hex
//! /lang/<any(en,fr):code>    one of the listed literals
//! /page-<int:n>.html         placeholders may sit inside a segment
//! ```
//!
//! A rule ending in `/` also matches the same path without the trailing
//! slash. Converter arguments other than `any(...)`'s choices (for example
//! `string(length=2)`) are accepted and ignored.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::error::PatternError;

const UUID_PATTERN: &str =
    "[A-Fa-f0-9]{8}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{12}";

/// A compiled route rule.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    rule: String,
    regex: Regex,
    names: Vec<String>,
}

impl RoutePattern {
    /// Compile a rule.
    pub fn parse(rule: &str) -> Result<Self, PatternError> {
        if !rule.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(rule.to_string()));
        }

        let mut regex = String::from("^");
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut rest = rule;

        while let Some(open) = rest.find('<') {
            regex.push_str(&regex::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let close = after
                .find('>')
                .ok_or_else(|| PatternError::UnclosedPlaceholder(rule.to_string()))?;
            let placeholder = &after[..close];

            let (name, converter) = parse_placeholder(rule, placeholder)?;
            if !seen.insert(name.to_string()) {
                return Err(PatternError::DuplicatePlaceholder {
                    rule: rule.to_string(),
                    name: name.to_string(),
                });
            }
            regex.push_str(&format!("(?P<{}>{})", name, converter));
            names.push(name.to_string());

            rest = &after[close + 1..];
        }

        match rest.strip_suffix('/') {
            Some(body) if rule.len() > 1 || !body.is_empty() => {
                regex.push_str(&regex::escape(body));
                regex.push_str("/?");
            }
            _ => regex.push_str(&regex::escape(rest)),
        }
        regex.push('$');

        let regex = Regex::new(&regex).map_err(|e| PatternError::Regex {
            rule: rule.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            rule: rule.to_string(),
            regex,
            names,
        })
    }

    /// The rule text this pattern was compiled from.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Placeholder names in rule order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Match a decoded request path, returning the captured placeholders.
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// Split `conv(args):name` or `name` and return the name with the
/// converter's regex.
fn parse_placeholder<'a>(
    rule: &str,
    placeholder: &'a str,
) -> Result<(&'a str, String), PatternError> {
    let (converter, name) = match placeholder.rsplit_once(':') {
        Some((converter, name)) => (converter.trim(), name.trim()),
        None => ("string", placeholder.trim()),
    };

    if !is_identifier(name) {
        return Err(PatternError::InvalidPlaceholder {
            rule: rule.to_string(),
            placeholder: placeholder.to_string(),
        });
    }

    let (converter_name, args) = match converter.split_once('(') {
        Some((head, tail)) => {
            let args = tail.strip_suffix(')').ok_or_else(|| PatternError::InvalidPlaceholder {
                rule: rule.to_string(),
                placeholder: placeholder.to_string(),
            })?;
            (head.trim(), Some(args))
        }
        None => (converter, None),
    };

    let regex = match converter_name {
        "string" | "default" => "[^/]+".to_string(),
        "int" => r"\d+".to_string(),
        "float" => r"\d+\.\d+".to_string(),
        "path" => "[^/].*?".to_string(),
        "uuid" => UUID_PATTERN.to_string(),
        "any" => {
            let choices: Vec<String> = args
                .unwrap_or_default()
                .split(',')
                .map(|c| c.trim().trim_matches(|q: char| q == '"' || q == '\''))
                .filter(|c| !c.is_empty())
                .map(regex::escape)
                .collect();
            if choices.is_empty() {
                return Err(PatternError::InvalidPlaceholder {
                    rule: rule.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
            format!("(?:{})", choices.join("|"))
        }
        other => {
            return Err(PatternError::UnknownConverter {
                rule: rule.to_string(),
                converter: other.to_string(),
            })
        }
    };

    Ok((name, regex))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Tests
// =============================================================================
