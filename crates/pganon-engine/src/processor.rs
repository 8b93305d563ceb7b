//! Scalar column processing: stream rows, rewrite values through the
//! dictionary, write back in batches.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::postgres::PgConnection;

use pganon_core::{ColumnRef, Error, Result};
use pganon_db::BatchProcessor;
use pganon_generate::Generator;

use crate::cancel::CancelFlag;
use crate::dictionary::Dictionary;

/// Retry budget when a unique-constrained column keeps colliding.
pub const MAX_COLLISION_RETRIES: usize = 100;

/// Counters returned by a column processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessResult {
    pub rows_processed: u64,
    pub values_anonymized: u64,
    pub unique_values: u64,
}

/// Insert a numeric suffix into a value that must be made unique. Email-shaped
/// values keep their domain: the suffix lands just before the last '@'.
pub fn add_unique_suffix(value: &str, suffix: usize) -> String {
    match value.rfind('@') {
        Some(idx) if idx > 0 => format!("{}{}{}", &value[..idx], suffix, &value[idx..]),
        _ => format!("{value}{suffix}"),
    }
}

/// Processes one non-JSON column inside the run's transaction.
pub struct ColumnProcessor<'a> {
    column: ColumnRef,
    generator: Arc<dyn Generator>,
    dictionary: &'a Dictionary,
    batch_size: usize,
    has_unique: bool,
}

impl<'a> ColumnProcessor<'a> {
    pub fn new(
        column: ColumnRef,
        generator: Arc<dyn Generator>,
        dictionary: &'a Dictionary,
        batch_size: usize,
        has_unique: bool,
    ) -> Self {
        Self {
            column,
            generator,
            dictionary,
            batch_size,
            has_unique,
        }
    }

    /// Stream every non-null row of the column and rewrite it. The cursor is
    /// closed on all exit paths; the surrounding transaction handles
    /// atomicity.
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

            let mut updates: HashMap<String, String> = HashMap::with_capacity(rows.len());

            for row in &rows {
                if row.value.is_empty() {
                    continue;
                }

                let anonymized = match self.dictionary.get(&row.value) {
                    Some(existing) => existing,
                    None => {
                        result.unique_values += 1;
                        self.fresh_value(&row.value, &row.ctid)?
                    }
                };

                updates.insert(row.ctid.clone(), anonymized);
                result.values_anonymized += 1;
            }

            batch.update_batch(conn, &updates).await?;
            result.rows_processed += rows.len() as u64;
            progress(result.rows_processed);
        }

        Ok(result)
    }

    /// Generate a replacement for a value seen for the first time, applying
    /// the collision-retry loop for unique-constrained columns.
    fn fresh_value(&self, original: &str, ctid: &str) -> Result<String> {
        let candidate = self.generator.generate(original);

        if !self.has_unique {
            self.dictionary.put(original, &candidate);
            return Ok(candidate);
        }

        if self.dictionary.put_unique(original, &candidate) {
            return Ok(candidate);
        }

        for suffix in 1..=MAX_COLLISION_RETRIES {
            let retry = add_unique_suffix(&candidate, suffix);
            if self.dictionary.put_unique(original, &retry) {
                return Ok(retry);
            }
        }

        Err(Error::Anonymization {
            column: self.column.clone(),
            ctid: Some(ctid.to_string()),
            message: format!(
                "failed to generate a unique value after {MAX_COLLISION_RETRIES} attempts"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pganon_generate::Generator;

    #[test]
    fn suffix_lands_before_the_at_sign_for_emails() {
        assert_eq!(
            add_unique_suffix("jane.doe@example.com", 1),
            "jane.doe1@example.com"
        );
        assert_eq!(add_unique_suffix("555-0123", 2), "555-01232");
        // '@' first means not email-shaped
        assert_eq!(add_unique_suffix("@handle", 3), "@handle3");
    }

    /// A generator that always emits the same value, forcing collisions.
    struct Constant;

    impl Generator for Constant {
        fn name(&self) -> &str {
            "CONSTANT"
        }
        fn generate(&self, _input: &str) -> String {
            "same@example.com".to_string()
        }
    }

    fn processor<'a>(dict: &'a Dictionary, has_unique: bool) -> ColumnProcessor<'a> {
        ColumnProcessor::new(
            "public.users.email".parse().unwrap(),
            Arc::new(Constant),
            dict,
            100,
            has_unique,
        )
    }

    #[test]
    fn collisions_resolve_with_numeric_suffixes() {
        let dict = Dictionary::new(16).unwrap();
        let proc = processor(&dict, true);

        let first = proc.fresh_value("a@x.com", "(0,1)").unwrap();
        let second = proc.fresh_value("b@x.com", "(0,2)").unwrap();

        assert_eq!(first, "same@example.com");
        assert_eq!(second, "same1@example.com");
        assert_ne!(first, second);
        // Both suffix variants keep the domain intact.
        assert!(second.ends_with("@example.com"));
    }

    #[test]
    fn retry_exhaustion_is_a_column_scoped_error() {
        let dict = Dictionary::new(1024).unwrap();
        // Occupy the base value and every suffixed variant.
        dict.preload_used(&["same@example.com".to_string()]);
        let taken: Vec<String> = (1..=MAX_COLLISION_RETRIES)
            .map(|k| add_unique_suffix("same@example.com", k))
            .collect();
        dict.preload_used(&taken);

        let proc = processor(&dict, true);
        let err = proc.fresh_value("a@x.com", "(0,1)").unwrap_err();
        match err {
            Error::Anonymization { column, ctid, .. } => {
                assert_eq!(column.to_string(), "public.users.email");
                assert_eq!(ctid.as_deref(), Some("(0,1)"));
            }
            other => panic!("expected anonymization error, got {other}"),
        }
    }

    #[test]
    fn non_unique_columns_share_colliding_outputs() {
        let dict = Dictionary::new(16).unwrap();
        let proc = processor(&dict, false);

        let first = proc.fresh_value("a@x.com", "(0,1)").unwrap();
        let second = proc.fresh_value("b@x.com", "(0,2)").unwrap();
        assert_eq!(first, second);
    }
}
