//! Read-only schema introspection used during preflight.

use std::collections::HashSet;

use sqlx::postgres::PgPool;
use sqlx::Row;

use pganon_core::{ColumnRef, Error, Result};

use crate::quote_ident;

/// Answers schema questions against `information_schema` and the system
/// catalogs. All operations are read-only and run outside the main
/// transaction.
pub struct SchemaInspector<'a> {
    pool: &'a PgPool,
}

impl<'a> SchemaInspector<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Check that every column exists; returns the ones that do not.
    pub async fn validate_columns(&self, columns: &[ColumnRef]) -> Result<Vec<ColumnRef>> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let schemas: Vec<String> = columns.iter().map(|c| c.schema.clone()).collect();
        let tables: Vec<String> = columns.iter().map(|c| c.table.clone()).collect();
        let names: Vec<String> = columns.iter().map(|c| c.column.clone()).collect();

        let rows = sqlx::query(
            r#"
            SELECT table_schema, table_name, column_name
            FROM information_schema.columns
            WHERE (table_schema, table_name, column_name) IN (
                SELECT * FROM unnest($1::text[], $2::text[], $3::text[])
            )
            "#,
        )
        .bind(&schemas)
        .bind(&tables)
        .bind(&names)
        .fetch_all(self.pool)
        .await
        .map_err(|err| Error::database("validate", err))?;

        let mut existing: HashSet<ColumnRef> = HashSet::new();
        for row in rows {
            existing.insert(ColumnRef::new(
                row.try_get::<String, _>(0)
                    .map_err(|err| Error::database("validate", err))?,
                row.try_get::<String, _>(1)
                    .map_err(|err| Error::database("validate", err))?,
                row.try_get::<String, _>(2)
                    .map_err(|err| Error::database("validate", err))?,
            ));
        }

        Ok(columns
            .iter()
            .filter(|col| !existing.contains(col))
            .cloned()
            .collect())
    }

    /// Declared SQL data type of a column, as reported by
    /// `information_schema.columns`.
    pub async fn data_type(&self, col: &ColumnRef) -> Result<String> {
        let row = sqlx::query(
            r#"
            SELECT data_type
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2 AND column_name = $3
            "#,
        )
        .bind(&col.schema)
        .bind(&col.table)
        .bind(&col.column)
        .fetch_optional(self.pool)
        .await
        .map_err(|err| Error::database_on("get_type", col.clone(), err))?;

        match row {
            Some(row) => row
                .try_get::<String, _>(0)
                .map_err(|err| Error::database_on("get_type", col.clone(), err)),
            None => Err(Error::database_msg(
                "get_type",
                format!("column {col} not found"),
            )),
        }
    }

    /// Fast row estimate from `pg_class.reltuples`; progress display only.
    pub async fn row_estimate(&self, schema: &str, table: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(c.reltuples, 0)::bigint
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
            "#,
        )
        .bind(schema)
        .bind(table)
        .fetch_optional(self.pool)
        .await
        .map_err(|err| Error::database("estimate", err))?;

        match row {
            Some(row) => row
                .try_get::<i64, _>(0)
                .map_err(|err| Error::database("estimate", err)),
            None => Ok(0),
        }
    }

    /// True when the column takes part in a primary key, a unique
    /// constraint, or a unique index.
    pub async fn has_unique(&self, col: &ColumnRef) -> Result<bool> {
        let constrained: bool = sqlx::query(
            r#"
            SELECT COUNT(*) > 0
            FROM pg_constraint c
            JOIN pg_class t ON t.oid = c.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = $1
              AND t.relname = $2
              AND a.attname = $3
              AND c.contype IN ('u', 'p')
              AND a.attnum = ANY(c.conkey)
            "#,
        )
        .bind(&col.schema)
        .bind(&col.table)
        .bind(&col.column)
        .fetch_one(self.pool)
        .await
        .and_then(|row| row.try_get(0))
        .map_err(|err| Error::database_on("check_unique", col.clone(), err))?;

        if constrained {
            return Ok(true);
        }

        // Unique indexes created outside of constraints.
        sqlx::query(
            r#"
            SELECT COUNT(*) > 0
            FROM pg_index i
            JOIN pg_class t ON t.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = $1
              AND t.relname = $2
              AND a.attname = $3
              AND i.indisunique
              AND a.attnum = ANY(i.indkey)
            "#,
        )
        .bind(&col.schema)
        .bind(&col.table)
        .bind(&col.column)
        .fetch_one(self.pool)
        .await
        .and_then(|row| row.try_get(0))
        .map_err(|err| Error::database_on("check_unique_index", col.clone(), err))
    }

    /// Distinct non-null values of a column, cast to text. Seeds the
    /// dictionary's reverse index so new values cannot collide with rows
    /// outside the anonymization scope.
    pub async fn distinct_values(&self, col: &ColumnRef) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {col_ident}::text FROM {schema}.{table} WHERE {col_ident} IS NOT NULL",
            col_ident = quote_ident(&col.column),
            schema = quote_ident(&col.schema),
            table = quote_ident(&col.table),
        );

        let rows = sqlx::query(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|err| Error::database_on("get_distinct", col.clone(), err))?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|err| Error::database_on("get_distinct", col.clone(), err))
            })
            .collect()
    }
}
