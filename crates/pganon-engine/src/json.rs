//! JSON/JSONB column processing: extract string values at configured paths,
//! rewrite them through the dictionary, and write the re-serialized
//! documents back.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sqlx::postgres::PgConnection;
use tracing::warn;

use pganon_core::{ColumnRef, Error, Result};
use pganon_db::BatchProcessor;
use pganon_generate::Generator;

use crate::cancel::CancelFlag;
use crate::dictionary::Dictionary;
use crate::jsonpath::PathExpr;
use crate::processor::ProcessResult;

/// A configured path with its bound generator.
pub struct BoundPath {
    pub path: PathExpr,
    pub generator: Arc<dyn Generator>,
}

/// Processes one JSON/JSONB column inside the run's transaction.
pub struct JsonColumnProcessor<'a> {
    column: ColumnRef,
    paths: Vec<BoundPath>,
    dictionary: &'a Dictionary,
    batch_size: usize,
}

impl<'a> JsonColumnProcessor<'a> {
    pub fn new(
        column: ColumnRef,
        paths: Vec<BoundPath>,
        dictionary: &'a Dictionary,
        batch_size: usize,
    ) -> Self {
        Self {
            column,
            paths,
            dictionary,
            batch_size,
        }
    }

    pub async fn process(
        &self,
        conn: &mut PgConnection,
        data_type: &str,
        cancel: &CancelFlag,
        mut progress: impl FnMut(u64),
    ) -> Result<ProcessResult> {
        let mut batch = BatchProcessor::new(self.column.clone(), data_type, self.batch_size);

        batch.open_cursor(conn).await?;
        let result = self.run(&mut batch, conn, cancel, &mut progress).await;
        let _ = batch.close_cursor(conn).await;
        result
    }

    async fn run(
        &self,
        batch: &mut BatchProcessor,
        conn: &mut PgConnection,
        cancel: &CancelFlag,
        progress: &mut impl FnMut(u64),
    ) -> Result<ProcessResult> {
        let mut result = ProcessResult::default();

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let rows = batch.fetch_batch(conn).await?;
            if rows.is_empty() {
                break;
            }

            let mut updates: HashMap<String, String> = HashMap::new();

            for row in &rows {
                if row.value.is_empty() {
                    continue;
                }

                match self.rewrite_document(&row.value)? {
                    Some((rewritten, replaced)) if replaced > 0 => {
                        updates.insert(row.ctid.clone(), rewritten);
                        result.values_anonymized += replaced;
                    }
                    Some(_) => {}
                    None => {
                        // Hand-edited documents happen; skip the row.
                        warn!(
                            column = %self.column,
                            ctid = %row.ctid,
                            "row holds invalid JSON, skipping"
                        );
                    }
                }
            }

            batch.update_batch(conn, &updates).await?;
            result.rows_processed += rows.len() as u64;
            progress(result.rows_processed);
        }

        Ok(result)
    }

    /// Rewrite one document. Returns None for unparseable JSON, otherwise
    /// the new text and how many values were replaced.
    fn rewrite_document(&self, text: &str) -> Result<Option<(String, u64)>> {
        let Ok(mut doc) = serde_json::from_str::<Value>(text) else {
            return Ok(None);
        };

        // concrete path -> anonymized value, one entry per matched location
        let mut replacements: Vec<(PathExpr, String)> = Vec::new();

        for bound in &self.paths {
            for found in bound.path.extract(&doc) {
                let anonymized = match self.dictionary.get(&found.value) {
                    Some(existing) => existing,
                    None => {
                        let fresh = bound.generator.generate(&found.value);
                        self.dictionary.put(&found.value, &fresh);
                        fresh
                    }
                };
                let concrete = PathExpr::parse(&found.path)?;
                replacements.push((concrete, anonymized));
            }
        }

        if replacements.is_empty() {
            return Ok(Some((text.to_string(), 0)));
        }

        let replaced = replacements.len() as u64;
        crate::jsonpath::apply_replacements(&mut doc, &replacements);

        let rewritten = serde_json::to_string(&doc).map_err(|err| Error::Anonymization {
            column: self.column.clone(),
            ctid: None,
            message: format!("failed to serialize rewritten JSON: {err}"),
        })?;

        Ok(Some((rewritten, replaced)))
    }
}
