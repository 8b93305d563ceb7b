//! Anonymization pattern model and registry.
//!
//! A pattern either names a built-in generator (`replacement`) or declares a
//! format spec from which a generator is built. The registry is
//! case-insensitive and merges a default file with an optional user file,
//! rejecting name conflicts unless the defaults are disabled.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named anonymization pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    /// Name of the generator this pattern resolves to.
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub note: Option<String>,

    /// Format string for format-backed patterns (strftime, printf, or mask).
    #[serde(default)]
    pub format: Option<String>,
    /// Format kind: "date", "number", or "mask". Inferred when absent.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub min_year: Option<i32>,
    #[serde(default)]
    pub max_year: Option<i32>,
}

impl Pattern {
    /// True when this pattern declares a format spec instead of aliasing a
    /// built-in generator.
    pub fn is_format(&self) -> bool {
        self.format.is_some()
    }
}

/// On-disk pattern file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternFile {
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl PatternFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            Error::pattern(format!(
                "failed to read pattern file {}: {err}",
                path.display()
            ))
        })?;
        let file: PatternFile = serde_yaml::from_str(&data).map_err(|err| {
            Error::pattern(format!(
                "failed to parse pattern file {}: {err}",
                path.display()
            ))
        })?;

        for pattern in &file.patterns {
            if pattern.name.is_empty() {
                return Err(Error::pattern(format!(
                    "pattern in {} has an empty name",
                    path.display()
                )));
            }
            if pattern.replacement.is_none() && pattern.format.is_none() {
                return Err(Error::pattern_named(
                    &pattern.name,
                    "pattern must have either a 'replacement' or a 'format' field",
                ));
            }
        }

        Ok(file)
    }
}

/// Patterns indexed by upper-cased name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    patterns: BTreeMap<String, Pattern>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pattern; duplicate names (case-insensitive) are an error.
    pub fn add(&mut self, pattern: Pattern) -> Result<()> {
        let key = pattern.name.to_uppercase();
        if self.patterns.contains_key(&key) {
            return Err(Error::pattern_named(&pattern.name, "pattern already exists"));
        }
        self.patterns.insert(key, pattern);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(&name.to_uppercase())
    }

    /// Pattern names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn add_file(&mut self, file: PatternFile) -> Result<()> {
        for pattern in file.patterns {
            self.add(pattern)?;
        }
        Ok(())
    }

    /// Merge a user pattern file, rejecting names that collide with patterns
    /// already present.
    fn merge_file(&mut self, file: PatternFile) -> Result<()> {
        let conflicts: Vec<String> = file
            .patterns
            .iter()
            .filter(|p| self.contains(&p.name))
            .map(|p| p.name.clone())
            .collect();

        if !conflicts.is_empty() {
            return Err(Error::pattern(format!(
                "user patterns conflict with default patterns: {}",
                conflicts.join(", ")
            )));
        }

        self.add_file(file)
    }
}

/// Build a registry from the default and user pattern files.
///
/// With `disable_defaults` the user file is authoritative and loaded without
/// conflict checking; otherwise user names that shadow defaults are rejected.
pub fn load_registry(
    default_path: Option<&str>,
    user_path: Option<&str>,
    disable_defaults: bool,
) -> Result<Registry> {
    let mut registry = Registry::new();

    if !disable_defaults {
        if let Some(path) = default_path {
            registry.add_file(PatternFile::load(path)?)?;
        }
    }

    if let Some(path) = user_path {
        let file = PatternFile::load(path)?;
        if disable_defaults {
            registry.add_file(file)?;
        } else {
            registry.merge_file(file)?;
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn named(name: &str) -> Pattern {
        Pattern {
            name: name.to_string(),
            replacement: Some("EMAIL".to_string()),
            ..Pattern::default()
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.add(named("Us_Phone")).unwrap();
        assert!(registry.get("US_PHONE").is_some());
        assert!(registry.get("us_phone").is_some());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        registry.add(named("EMAIL")).unwrap();
        let err = registry.add(named("email")).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    fn write_patterns(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_rejects_pattern_without_replacement_or_format() {
        let file = write_patterns("patterns:\n  - name: BROKEN\n");
        let err = PatternFile::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("replacement"));
    }

    #[test]
    fn user_conflict_with_defaults_is_rejected() {
        let defaults = write_patterns(
            "patterns:\n  - name: CUSTOMER_EMAIL\n    replacement: EMAIL\n",
        );
        let user = write_patterns(
            "patterns:\n  - name: customer_email\n    replacement: EMAIL\n",
        );
        let err = load_registry(
            defaults.path().to_str(),
            user.path().to_str(),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn disabled_defaults_make_user_patterns_authoritative() {
        let defaults = write_patterns(
            "patterns:\n  - name: CUSTOMER_EMAIL\n    replacement: EMAIL\n",
        );
        let user = write_patterns(
            "patterns:\n  - name: CUSTOMER_EMAIL\n    format: \"####\"\n",
        );
        let registry =
            load_registry(defaults.path().to_str(), user.path().to_str(), true).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("CUSTOMER_EMAIL").unwrap().is_format());
    }

    #[test]
    fn format_pattern_parses_bounds() {
        let file = write_patterns(
            "patterns:\n  - name: ORDER_NO\n    format: \"ORD-%06d\"\n    type: number\n    min: 1\n    max: 999999\n",
        );
        let parsed = PatternFile::load(file.path()).unwrap();
        let p = &parsed.patterns[0];
        assert!(p.is_format());
        assert_eq!(p.min, Some(1));
        assert_eq!(p.max, Some(999_999));
    }
}
