use thiserror::Error;

use crate::column::ColumnRef;

/// Error type shared across pganon crates.
///
/// Every failure is fatal to the run; the orchestrator rolls the transaction
/// back and surfaces one of these to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete configuration.
    #[error("config error{}: {message}", fmt_path(.path))]
    Config {
        path: Option<String>,
        message: String,
    },

    /// Unknown pattern name, conflicting user pattern, or malformed format spec.
    #[error("pattern error{}: {message}", fmt_name(.name))]
    Pattern {
        name: Option<String>,
        message: String,
    },

    /// Configured columns that do not exist in the database.
    #[error("validation error: columns not found in database: {}", fmt_columns(.missing))]
    Validation { missing: Vec<ColumnRef> },

    /// Driver or database failure, tagged with the operation that failed.
    #[error("database error during {operation}{}: {message}", fmt_column(.column))]
    Database {
        operation: String,
        column: Option<ColumnRef>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Per-value failure, e.g. uniqueness-retry exhaustion.
    #[error("anonymization error on {column}{}: {message}", fmt_ctid(.ctid))]
    Anonymization {
        column: ColumnRef,
        ctid: Option<String>,
        message: String,
    },

    /// Cooperative cancellation between batches.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            path: None,
            message: message.into(),
        }
    }

    pub fn config_at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            path: Some(path.into()),
            message: message.into(),
        }
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Error::Pattern {
            name: None,
            message: message.into(),
        }
    }

    pub fn pattern_named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pattern {
            name: Some(name.into()),
            message: message.into(),
        }
    }

    pub fn database(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            operation: operation.into(),
            column: None,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn database_on(
        operation: impl Into<String>,
        column: ColumnRef,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            operation: operation.into(),
            column: Some(column),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn database_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Database {
            operation: operation.into(),
            column: None,
            message: message.into(),
            source: None,
        }
    }
}

/// Convenience alias for results returned by pganon crates.
pub type Result<T> = std::result::Result<T, Error>;

fn fmt_path(path: &Option<String>) -> String {
    match path {
        Some(p) => format!(" ({p})"),
        None => String::new(),
    }
}

fn fmt_name(name: &Option<String>) -> String {
    match name {
        Some(n) => format!(" ({n})"),
        None => String::new(),
    }
}

fn fmt_column(column: &Option<ColumnRef>) -> String {
    match column {
        Some(c) => format!(" on {c}"),
        None => String::new(),
    }
}

fn fmt_ctid(ctid: &Option<String>) -> String {
    match ctid {
        Some(t) => format!(" (ctid {t})"),
        None => String::new(),
    }
}

fn fmt_columns(columns: &[ColumnRef]) -> String {
    columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
