//! Run statistics: per-column counters plus grand totals.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::column::ColumnRef;

/// Counters for a single processed column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: ColumnRef,
    pub rows_processed: u64,
    pub values_anonymized: u64,
    pub unique_values: u64,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Aggregate statistics for a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub columns: Vec<ColumnStats>,
    pub total_rows: u64,
    pub total_anonymized: u64,
    pub total_unique: u64,
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,
}

/// Accumulates per-column stats during a run.
#[derive(Debug, Default)]
pub struct StatsCollector {
    columns: Vec<ColumnStats>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: ColumnStats) {
        self.columns.push(stats);
    }

    pub fn finalize(self, total_duration: Duration) -> RunStats {
        let mut stats = RunStats {
            columns: self.columns,
            total_duration,
            ..RunStats::default()
        };
        for col in &stats.columns {
            stats.total_rows += col.rows_processed;
            stats.total_anonymized += col.values_anonymized;
            stats.total_unique += col.unique_values;
        }
        stats
    }
}

impl RunStats {
    /// Plain-text summary table for terminal output.
    pub fn render(&self) -> String {
        let col_width = self
            .columns
            .iter()
            .map(|c| c.column.to_string().len())
            .chain([6])
            .max()
            .unwrap_or(6);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<col_width$}  {:>10}  {:>10}  {:>9}",
            "Column", "Rows", "Values", "Duration"
        );
        let _ = writeln!(out, "{}", "-".repeat(col_width + 35));
        for col in &self.columns {
            let _ = writeln!(
                out,
                "{:<col_width$}  {:>10}  {:>10}  {:>9}",
                col.column.to_string(),
                col.rows_processed,
                col.values_anonymized,
                format_duration(col.duration)
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(col_width + 35));
        let _ = writeln!(
            out,
            "{:<col_width$}  {:>10}  {:>10}  {:>9}",
            "TOTAL",
            self.total_rows,
            self.total_anonymized,
            format_duration(self.total_duration)
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Columns processed: {}", self.columns.len());
        let _ = writeln!(out, "Unique values anonymized: {}", self.total_unique);
        out
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
