//! Configuration model for an anonymization run.
//!
//! The YAML file names the database, the pattern files, and the columns to
//! anonymize. Missing connection properties fall back to the libpq
//! environment variables so the tool behaves like other Postgres clients.

use std::env;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::column::ColumnRef;
use crate::error::{Error, Result};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// PostgreSQL connection properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub sslmode: Option<String>,
    #[serde(default)]
    pub sslcert: Option<String>,
    #[serde(default)]
    pub sslkey: Option<String>,
    #[serde(default)]
    pub sslrootcert: Option<String>,
}

/// Pattern file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternsConfig {
    #[serde(default)]
    pub default_path: Option<String>,
    #[serde(default)]
    pub user_path: Option<String>,
    #[serde(default)]
    pub disable_defaults: bool,
}

/// One column to anonymize: either a single pattern or a list of JSON paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub column: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub json_paths: Vec<JsonPathConfig>,
}

/// A JSON path inside a JSON/JSONB column, bound to a pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPathConfig {
    pub path: String,
    pub pattern: String,
}

impl ColumnConfig {
    /// True when the column is configured through JSON paths instead of a
    /// single pattern.
    pub fn is_json(&self) -> bool {
        !self.json_paths.is_empty()
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl DatabaseConfig {
    /// Effective host, falling back to PGHOST then localhost.
    pub fn effective_host(&self) -> String {
        self.host
            .clone()
            .or_else(|| env_nonempty("PGHOST"))
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Effective port, falling back to PGPORT then 5432.
    pub fn effective_port(&self) -> u16 {
        self.port
            .or_else(|| env_nonempty("PGPORT").and_then(|v| v.parse().ok()))
            .unwrap_or(5432)
    }

    /// Effective database name, falling back to PGDATABASE.
    pub fn effective_database(&self) -> Option<String> {
        self.database.clone().or_else(|| env_nonempty("PGDATABASE"))
    }

    /// Effective user, falling back to PGUSER and then the OS user, the same
    /// way libpq does.
    pub fn effective_user(&self) -> Option<String> {
        self.user
            .clone()
            .or_else(|| env_nonempty("PGUSER"))
            .or_else(|| env_nonempty("USER"))
    }

    /// Effective password, falling back to PGPASSWORD.
    pub fn effective_password(&self) -> Option<String> {
        self.password.clone().or_else(|| env_nonempty("PGPASSWORD"))
    }

    /// Effective sslmode, falling back to PGSSLMODE then `prefer`.
    pub fn effective_sslmode(&self) -> String {
        self.sslmode
            .clone()
            .or_else(|| env_nonempty("PGSSLMODE"))
            .unwrap_or_else(|| "prefer".to_string())
    }

    /// Connection summary safe for logs: no password.
    pub fn redacted(&self) -> RedactedConnection {
        RedactedConnection {
            host: self.effective_host(),
            port: self.effective_port(),
            database: self.effective_database().unwrap_or_default(),
            user: self.effective_user().unwrap_or_default(),
            sslmode: self.effective_sslmode(),
        }
    }
}

/// Connection descriptor with credentials removed.
#[derive(Debug, Clone, Serialize)]
pub struct RedactedConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub sslmode: String,
}

impl fmt::Display for RedactedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{} (sslmode={})",
            self.user, self.host, self.port, self.database, self.sslmode
        )
    }
}

const VALID_SSLMODES: &[&str] = &["disable", "prefer", "require", "verify-ca", "verify-full"];

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            Error::config_at(
                path.display().to_string(),
                format!("failed to read config file: {err}"),
            )
        })?;
        serde_yaml::from_str(&data).map_err(|err| {
            Error::config_at(
                path.display().to_string(),
                format!("failed to parse config file: {err}"),
            )
        })
    }

    /// Check the configuration for completeness. Collects every problem
    /// rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.database.effective_database().is_none() {
            problems.push("database name is required".to_string());
        }
        if self.database.effective_user().is_none() {
            problems.push("database user is required".to_string());
        }
        if let Some(mode) = &self.database.sslmode {
            if !VALID_SSLMODES.contains(&mode.as_str()) {
                problems.push(format!(
                    "sslmode {mode:?} is not one of {}",
                    VALID_SSLMODES.join(", ")
                ));
            }
        }

        if self.columns.is_empty() {
            problems.push("at least one column must be configured".to_string());
        }

        for (i, col) in self.columns.iter().enumerate() {
            if col.column.is_empty() {
                problems.push(format!("columns[{i}]: column name is required"));
            } else if col.column.parse::<ColumnRef>().is_err() {
                problems.push(format!(
                    "columns[{i}]: {:?} must be in schema.table.column format",
                    col.column
                ));
            }

            match (&col.pattern, col.is_json()) {
                (Some(_), true) => problems.push(format!(
                    "columns[{i}]: pattern and json_paths are mutually exclusive"
                )),
                (None, false) => problems.push(format!(
                    "columns[{i}]: either pattern or json_paths is required"
                )),
                _ => {}
            }

            for (j, jp) in col.json_paths.iter().enumerate() {
                if jp.path.is_empty() {
                    problems.push(format!("columns[{i}].json_paths[{j}]: path is required"));
                }
                if jp.pattern.is_empty() {
                    problems.push(format!("columns[{i}].json_paths[{j}]: pattern is required"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::config(problems.join("; ")))
        }
    }

    /// Parsed column references in configuration order.
    pub fn column_refs(&self) -> Result<Vec<ColumnRef>> {
        self.columns.iter().map(|c| c.column.parse()).collect()
    }
}

/// Search the standard locations for the default patterns file.
///
/// Order: the path from the config file, `/etc/pganon`, the directory holding
/// the executable, then the current directory.
pub fn find_default_patterns_file(config_path: Option<&str>) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();

    if let Some(path) = config_path {
        candidates.push(path.to_string());
    }
    candidates.push("/etc/pganon/pganon-patterns.yaml".to_string());
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("pganon-patterns.yaml").display().to_string());
        }
    }
    candidates.push("pganon-patterns.yaml".to_string());

    candidates
        .into_iter()
        .find(|path| Path::new(path).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        Config {
            database: DatabaseConfig {
                database: Some("appdb".into()),
                user: Some("app".into()),
                ..DatabaseConfig::default()
            },
            patterns: PatternsConfig::default(),
            columns: vec![ColumnConfig {
                column: "public.users.email".into(),
                pattern: Some("EMAIL".into()),
                json_paths: Vec::new(),
            }],
        }
    }

    #[test]
    fn minimal_config_validates() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn rejects_pattern_and_json_paths_together() {
        let mut cfg = minimal();
        cfg.columns[0].json_paths.push(JsonPathConfig {
            path: "$.email".into(),
            pattern: "EMAIL".into(),
        });
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn rejects_column_without_pattern_or_paths() {
        let mut cfg = minimal();
        cfg.columns[0].pattern = None;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("either pattern or json_paths"));
    }

    #[test]
    fn rejects_two_part_column_name() {
        let mut cfg = minimal();
        cfg.columns[0].column = "users.email".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_sslmode() {
        let mut cfg = minimal();
        cfg.database.sslmode = Some("sometimes".into());
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("sslmode"));
    }

    #[test]
    fn parses_yaml_with_json_paths() {
        let yaml = r#"
database:
  host: db.internal
  database: appdb
  user: app
columns:
  - column: public.users.profile
    json_paths:
      - path: "$.contacts[*].email"
        pattern: EMAIL
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.columns[0].is_json());
        assert_eq!(cfg.columns[0].json_paths[0].pattern, "EMAIL");
    }

    #[test]
    fn redacted_connection_has_no_password() {
        let mut cfg = minimal();
        cfg.database.password = Some("hunter2".into());
        let shown = cfg.database.redacted().to_string();
        assert!(!shown.contains("hunter2"));
    }
}
