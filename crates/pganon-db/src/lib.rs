//! PostgreSQL access for the pganon anonymizer.
//!
//! Read-side schema introspection runs against a pool before the main
//! transaction; the batch machinery runs inside the single SERIALIZABLE
//! transaction that covers the whole run.

pub mod batch;
pub mod connect;
pub mod fk;
pub mod schema;

pub use batch::{BatchProcessor, RowData, DEFAULT_BATCH_SIZE};
pub use connect::{begin_serializable, Connector};
pub use fk::{cascade_targets, processing_order, FkAction, FkAnalyzer, ForeignKey};
pub use schema::SchemaInspector;

/// Quote a SQL identifier, doubling any embedded quotes.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
