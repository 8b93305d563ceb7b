//! Whole-run orchestration.
//!
//! A run moves through Loading → Validating → Analyzing → Transacting and
//! ends Committed or RolledBack. Everything that writes happens inside one
//! SERIALIZABLE transaction; any error rolls the whole run back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use sqlx::postgres::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use pganon_core::{
    ColumnRef, ColumnStats, Config, Error, Registry, Result, RunStats, StatsCollector,
};
use pganon_db::{begin_serializable, Connector, FkAnalyzer, SchemaInspector};
use pganon_generate::{Generator, Manager};

use crate::cancel::CancelFlag;
use crate::dictionary::Dictionary;
use crate::json::{BoundPath, JsonColumnProcessor};
use crate::jsonpath::PathExpr;
use crate::processor::ColumnProcessor;

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rows per cursor fetch and per batched update.
    pub batch_size: usize,
    /// Tier-1 dictionary capacity (0 = default).
    pub cache_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: pganon_db::DEFAULT_BATCH_SIZE,
            cache_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Validating,
    Analyzing,
    Transacting,
    Committed,
    RolledBack,
}

enum TaskKind {
    Scalar {
        generator: Arc<dyn Generator>,
        has_unique: bool,
    },
    Json {
        paths: Vec<(PathExpr, String)>,
    },
}

struct ColumnTask {
    column: ColumnRef,
    data_type: String,
    kind: TaskKind,
}

/// What a run would do: produced by preflight, also used by `validate`.
#[derive(Debug)]
pub struct PreflightReport {
    pub order: Vec<ColumnRef>,
    pub cascade_targets: Vec<ColumnRef>,
}

/// Drives a complete anonymization run.
pub struct Anonymizer {
    config: Config,
    generators: Manager,
    options: RunOptions,
    run_id: Uuid,
}

impl Anonymizer {
    /// Build an anonymizer from validated configuration and a loaded pattern
    /// registry.
    pub fn new(config: Config, patterns: &Registry, options: RunOptions) -> Result<Self> {
        let mut generators = Manager::new();
        generators.register_patterns(patterns)?;

        Ok(Self {
            config,
            generators,
            options,
            run_id: Uuid::new_v4(),
        })
    }

    fn enter(&self, phase: Phase) {
        debug!(run_id = %self.run_id, ?phase, "run phase");
    }

    /// Resolve every configured column into a task, checking that columns,
    /// patterns, and JSON paths all exist.
    async fn build_tasks(
        &self,
        pool: &PgPool,
    ) -> Result<(Vec<ColumnTask>, PreflightReport)> {
        self.enter(Phase::Validating);
        let columns = self.config.column_refs()?;

        let inspector = SchemaInspector::new(pool);
        let missing = inspector.validate_columns(&columns).await?;
        if !missing.is_empty() {
            return Err(Error::Validation { missing });
        }

        let mut tasks = Vec::with_capacity(columns.len());
        for (col, cfg) in columns.iter().zip(&self.config.columns) {
            let data_type = inspector.data_type(col).await?;

            let kind = if cfg.is_json() {
                let mut paths = Vec::with_capacity(cfg.json_paths.len());
                for jp in &cfg.json_paths {
                    let path = PathExpr::parse(&jp.path)?;
                    if self.generators.get(&jp.pattern).is_none() {
                        return Err(Error::pattern_named(
                            &jp.pattern,
                            format!("unknown pattern for JSON path {} in column {col}", jp.path),
                        ));
                    }
                    paths.push((path, jp.pattern.clone()));
                }
                TaskKind::Json { paths }
            } else {
                let pattern = cfg.pattern.clone().unwrap_or_default();
                let generator = self.generators.get(&pattern).ok_or_else(|| {
                    Error::pattern_named(
                        &pattern,
                        format!("unknown pattern for column {col}"),
                    )
                })?;
                let has_unique = inspector.has_unique(col).await?;
                TaskKind::Scalar {
                    generator,
                    has_unique,
                }
            };

            tasks.push(ColumnTask {
                column: col.clone(),
                data_type,
                kind,
            });
        }

        self.enter(Phase::Analyzing);
        let analyzer = FkAnalyzer::new(pool);
        let order = analyzer.processing_order(&columns).await?;
        let cascade_targets = analyzer.cascade_targets(&columns).await?;

        Ok((
            tasks,
            PreflightReport {
                order,
                cascade_targets,
            },
        ))
    }

    /// Run preflight only: config shape, column existence, pattern and path
    /// resolution, FK analysis. Nothing is written.
    pub async fn preflight(&self) -> Result<PreflightReport> {
        self.enter(Phase::Loading);
        self.config.validate()?;

        let pool = Connector::new(&self.config.database).connect().await?;
        let (_tasks, report) = self.build_tasks(&pool).await?;
        Ok(report)
    }

    /// Execute the complete anonymization run.
    pub async fn run(&self, cancel: &CancelFlag) -> Result<RunStats> {
        self.enter(Phase::Loading);
        self.config.validate()?;

        let pool = Connector::new(&self.config.database).connect().await?;
        let (tasks, report) = self.build_tasks(&pool).await?;
        let inspector = SchemaInspector::new(&pool);

        let dictionary = Dictionary::new(self.options.cache_size)?;

        // Values already present in unique-constrained target columns must
        // never be produced for other rows.
        for task in &tasks {
            if let TaskKind::Scalar {
                has_unique: true, ..
            } = task.kind
            {
                let existing = inspector.distinct_values(&task.column).await?;
                dictionary.preload_used(&existing);
            }
        }

        let task_map: HashMap<&ColumnRef, &ColumnTask> =
            tasks.iter().map(|t| (&t.column, t)).collect();
        let skip: HashSet<&ColumnRef> = report.cascade_targets.iter().collect();

        self.enter(Phase::Transacting);
        let mut tx = begin_serializable(&pool).await?;

        let mut collector = StatsCollector::new();
        let started = Instant::now();

        for col in &report.order {
            if skip.contains(col) {
                info!(column = %col, "skipping CASCADE target");
                continue;
            }
            let Some(task) = task_map.get(col) else {
                // Ordering only ever returns configured columns.
                continue;
            };

            let estimate = inspector.row_estimate(&col.schema, &col.table).await?;
            info!(column = %col, estimated_rows = estimate, "processing column");

            let col_started = Instant::now();
            let outcome = self.process_task(&mut tx, task, &dictionary, cancel).await;

            let result = match outcome {
                Ok(result) => result,
                Err(err) => {
                    self.enter(Phase::RolledBack);
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            };

            info!(
                column = %col,
                rows = result.rows_processed,
                values = result.values_anonymized,
                "column complete"
            );
            collector.record(ColumnStats {
                column: col.clone(),
                rows_processed: result.rows_processed,
                values_anonymized: result.values_anonymized,
                unique_values: result.unique_values,
                duration: col_started.elapsed(),
            });
        }

        if let Err(err) = tx.commit().await {
            self.enter(Phase::RolledBack);
            return Err(Error::database("commit", err));
        }
        self.enter(Phase::Committed);

        Ok(collector.finalize(started.elapsed()))
    }

    async fn process_task(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
        task: &ColumnTask,
        dictionary: &Dictionary,
        cancel: &CancelFlag,
    ) -> Result<crate::processor::ProcessResult> {
        let column = task.column.clone();
        let progress = move |rows: u64| {
            if rows % 100_000 == 0 {
                debug!(column = %column, rows, "progress");
            }
        };

        match &task.kind {
            TaskKind::Scalar {
                generator,
                has_unique,
            } => {
                let processor = ColumnProcessor::new(
                    task.column.clone(),
                    generator.clone(),
                    dictionary,
                    self.options.batch_size,
                    *has_unique,
                );
                processor
                    .process(&mut *tx, &task.data_type, cancel, progress)
                    .await
            }
            TaskKind::Json { paths } => {
                let mut bound = Vec::with_capacity(paths.len());
                for (path, pattern) in paths {
                    let generator = self.generators.get(pattern).ok_or_else(|| {
                        Error::pattern_named(pattern, "pattern disappeared after preflight")
                    })?;
                    bound.push(BoundPath {
                        path: path.clone(),
                        generator,
                    });
                }
                let processor = JsonColumnProcessor::new(
                    task.column.clone(),
                    bound,
                    dictionary,
                    self.options.batch_size,
                );
                processor
                    .process(&mut *tx, &task.data_type, cancel, progress)
                    .await
            }
        }
    }
}
