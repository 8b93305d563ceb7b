//! Shared types for the pganon anonymizer.
//!
//! Everything the other crates agree on lives here: fully-qualified column
//! references, the configuration model, the pattern registry, the error
//! taxonomy, and run statistics.

pub mod column;
pub mod config;
pub mod error;
pub mod pattern;
pub mod stats;

pub use column::ColumnRef;
pub use config::{ColumnConfig, Config, DatabaseConfig, JsonPathConfig, PatternsConfig};
pub use error::{Error, Result};
pub use pattern::{Pattern, PatternFile, Registry};
pub use stats::{ColumnStats, RunStats, StatsCollector};
