//! Minimal JSON path language for addressing string values inside JSON
//! columns.
//!
//! Supported syntax: `$` root, `.field` access, `[<index>]` array index, and
//! `[*]` full-array wildcard, composable in any order. When a path is
//! expanded against a document, only the leftmost `[*]` is specialized to a
//! concrete index; deeper wildcards stay literal in the concrete path and
//! the replacement resolver fans out over them.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use pganon_core::{Error, Result};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Field(String),
    Index(usize),
    Wildcard,
}

/// A parsed path expression. Keeps the raw text for error messages and
/// concrete-path construction.
#[derive(Debug, Clone)]
pub struct PathExpr {
    raw: String,
    steps: Vec<Step>,
}

/// A string value found at a concrete location in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Concrete path, e.g. `$.contacts[0].email`.
    pub path: String,
    pub value: String,
}

impl PathExpr {
    /// Parse a path expression, rejecting anything outside the supported
    /// subset.
    pub fn parse(raw: &str) -> Result<Self> {
        let bytes = raw.as_bytes();
        if bytes.first() != Some(&b'$') {
            return Err(path_error(raw, "path must start with '$'"));
        }

        let mut steps = Vec::new();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && bytes[end] != b'.' && bytes[end] != b'[' {
                        end += 1;
                    }
                    if end == start {
                        return Err(path_error(raw, "empty field name"));
                    }
                    steps.push(Step::Field(raw[start..end].to_string()));
                    i = end;
                }
                b'[' => {
                    let close = raw[i..]
                        .find(']')
                        .map(|off| i + off)
                        .ok_or_else(|| path_error(raw, "unterminated '['"))?;
                    let inner = &raw[i + 1..close];
                    if inner == "*" {
                        steps.push(Step::Wildcard);
                    } else {
                        let index: usize = inner
                            .parse()
                            .map_err(|_| path_error(raw, "array index must be a number or '*'"))?;
                        steps.push(Step::Index(index));
                    }
                    i = close + 1;
                }
                _ => return Err(path_error(raw, "expected '.' or '['")),
            }
        }

        if steps.is_empty() {
            return Err(path_error(raw, "path addresses the whole document"));
        }

        Ok(Self {
            raw: raw.to_string(),
            steps,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All string values this path addresses in the document, each tagged
    /// with its concrete path. Null matches are skipped silently; other
    /// non-string matches are skipped with a warning.
    pub fn extract(&self, doc: &Value) -> Vec<PathMatch> {
        let mut matches = Vec::new();

        match self.steps.iter().position(|s| *s == Step::Wildcard) {
            None => {
                if let Some(value) = resolve_strict(doc, &self.steps) {
                    push_match(&mut matches, self.raw.clone(), value, &self.raw);
                }
            }
            Some(pos) => {
                let Some(parent) = resolve_strict(doc, &self.steps[..pos]) else {
                    return matches;
                };
                let Value::Array(items) = parent else {
                    return matches;
                };
                let rest = &self.steps[pos + 1..];
                for (index, item) in items.iter().enumerate() {
                    let concrete = specialize_first_wildcard(&self.raw, index);
                    for value in collect_values(item, rest) {
                        push_match(&mut matches, concrete.clone(), value, &self.raw);
                    }
                }
            }
        }

        matches
    }

    /// Set every value addressed by this path. Wildcards fan out; missing
    /// paths are ignored.
    pub fn set(&self, doc: &mut Value, new_value: &str) {
        set_at(doc, &self.steps, new_value);
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn path_error(raw: &str, message: &str) -> Error {
    Error::pattern(format!("invalid JSON path {raw:?}: {message}"))
}

fn push_match(matches: &mut Vec<PathMatch>, path: String, value: &Value, raw: &str) {
    match value {
        Value::String(s) => matches.push(PathMatch {
            path,
            value: s.clone(),
        }),
        Value::Null => {}
        other => {
            warn!(path = raw, "non-string value at JSON path, skipping: {}", type_name(other));
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Follow non-wildcard steps; None when the path does not exist.
fn resolve_strict<'a>(doc: &'a Value, steps: &[Step]) -> Option<&'a Value> {
    let mut current = doc;
    for step in steps {
        current = match step {
            Step::Field(name) => current.get(name.as_str())?,
            Step::Index(i) => current.get(*i)?,
            Step::Wildcard => return None,
        };
    }
    Some(current)
}

/// Collect every value reachable through the remaining steps, fanning out
/// over wildcards.
fn collect_values<'a>(doc: &'a Value, steps: &[Step]) -> Vec<&'a Value> {
    let Some((step, rest)) = steps.split_first() else {
        return vec![doc];
    };

    match step {
        Step::Field(name) => doc
            .get(name.as_str())
            .map(|v| collect_values(v, rest))
            .unwrap_or_default(),
        Step::Index(i) => doc
            .get(*i)
            .map(|v| collect_values(v, rest))
            .unwrap_or_default(),
        Step::Wildcard => match doc {
            Value::Array(items) => items
                .iter()
                .flat_map(|item| collect_values(item, rest))
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn set_at(doc: &mut Value, steps: &[Step], new_value: &str) {
    let Some((step, rest)) = steps.split_first() else {
        *doc = Value::String(new_value.to_string());
        return;
    };

    match step {
        Step::Field(name) => {
            if let Some(child) = doc.get_mut(name.as_str()) {
                set_at(child, rest, new_value);
            }
        }
        Step::Index(i) => {
            if let Some(child) = doc.get_mut(*i) {
                set_at(child, rest, new_value);
            }
        }
        Step::Wildcard => {
            if let Value::Array(items) = doc {
                for item in items {
                    set_at(item, rest, new_value);
                }
            }
        }
    }
}

/// Replace the leftmost `[*]` in the raw path text with a concrete index.
fn specialize_first_wildcard(raw: &str, index: usize) -> String {
    match raw.find("[*]") {
        Some(pos) => format!("{}[{}]{}", &raw[..pos], index, &raw[pos + 3..]),
        None => raw.to_string(),
    }
}

/// Apply a set of concrete-path replacements to a document.
pub fn apply_replacements(doc: &mut Value, replacements: &[(PathExpr, String)]) {
    for (path, value) in replacements {
        path.set(doc, value);
    }
}
