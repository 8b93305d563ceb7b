//! Server-side cursor reads and batched updates for one column, inside the
//! run's transaction.

use std::collections::HashMap;

use sqlx::postgres::PgConnection;
use sqlx::Row;

use pganon_core::{ColumnRef, Error, Result};

use crate::quote_ident;

/// Default number of rows per cursor fetch and per update statement.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// One row fetched for processing: the physical row id as text plus the
/// column value cast to text.
#[derive(Debug, Clone)]
pub struct RowData {
    pub ctid: String,
    pub value: String,
}

/// Cursor and update machinery for a single column.
pub struct BatchProcessor {
    column: ColumnRef,
    data_type: String,
    batch_size: usize,
    cursor_name: String,
    cursor_open: bool,
}

impl BatchProcessor {
    pub fn new(column: ColumnRef, data_type: impl Into<String>, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        let cursor_name = cursor_name_for(&column);

        Self {
            column,
            data_type: data_type.into(),
            batch_size,
            cursor_name,
            cursor_open: false,
        }
    }

    /// Declare the cursor. NULL values are excluded at the source.
    pub async fn open_cursor(&mut self, conn: &mut PgConnection) -> Result<()> {
        let sql = format!(
            "DECLARE {cursor} CURSOR FOR \
             SELECT ctid::text, {col}::text FROM {schema}.{table} WHERE {col} IS NOT NULL",
            cursor = self.cursor_name,
            col = quote_ident(&self.column.column),
            schema = quote_ident(&self.column.schema),
            table = quote_ident(&self.column.table),
        );

        sqlx::query(&sql)
            .execute(conn)
            .await
            .map_err(|err| Error::database_on("cursor_open", self.column.clone(), err))?;

        self.cursor_open = true;
        Ok(())
    }

    /// Fetch the next batch. An empty vec means end of stream.
    pub async fn fetch_batch(&self, conn: &mut PgConnection) -> Result<Vec<RowData>> {
        if !self.cursor_open {
            return Err(Error::database_msg(
                "fetch",
                format!("cursor not open for {}", self.column),
            ));
        }

        let sql = format!("FETCH {} FROM {}", self.batch_size, self.cursor_name);
        let rows = sqlx::query(&sql)
            .fetch_all(conn)
            .await
            .map_err(|err| Error::database_on("fetch", self.column.clone(), err))?;

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            batch.push(RowData {
                ctid: row
                    .try_get(0)
                    .map_err(|err| Error::database_on("fetch", self.column.clone(), err))?,
                value: row
                    .try_get(1)
                    .map_err(|err| Error::database_on("fetch", self.column.clone(), err))?,
            });
        }
        Ok(batch)
    }

    /// Close the cursor; safe to call when it never opened.
    pub async fn close_cursor(&mut self, conn: &mut PgConnection) -> Result<()> {
        if !self.cursor_open {
            return Ok(());
        }

        sqlx::query(&format!("CLOSE {}", self.cursor_name))
            .execute(conn)
            .await
            .map_err(|err| Error::database_on("cursor_close", self.column.clone(), err))?;

        self.cursor_open = false;
        Ok(())
    }

    /// Update many rows in one statement by joining against unnested ctid and
    /// value arrays. Non-text columns get an explicit cast back to their
    /// declared type.
    pub async fn update_batch(
        &self,
        conn: &mut PgConnection,
        updates: &HashMap<String, String>,
    ) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut ctids = Vec::with_capacity(updates.len());
        let mut values = Vec::with_capacity(updates.len());
        for (ctid, value) in updates {
            ctids.push(ctid.clone());
            values.push(value.clone());
        }

        let value_expr = if is_text_type(&self.data_type) {
            "u.new_value".to_string()
        } else {
            format!("u.new_value::{}", self.data_type)
        };

        let sql = format!(
            "UPDATE {schema}.{table} t \
             SET {col} = {value_expr} \
             FROM (SELECT unnest($1::text[]) AS ctid, unnest($2::text[]) AS new_value) u \
             WHERE t.ctid = u.ctid::tid",
            schema = quote_ident(&self.column.schema),
            table = quote_ident(&self.column.table),
            col = quote_ident(&self.column.column),
        );

        sqlx::query(&sql)
            .bind(&ctids)
            .bind(&values)
            .execute(conn)
            .await
            .map_err(|err| Error::database_on("batch_update", self.column.clone(), err))?;

        Ok(())
    }
}

fn is_text_type(data_type: &str) -> bool {
    matches!(data_type, "" | "text" | "character varying" | "character")
}

/// Cursor names are derived from the column ref, keeping only characters that
/// are safe in an unquoted identifier.
fn cursor_name_for(column: &ColumnRef) -> String {
    let raw = format!(
        "anon_{}_{}_{}",
        column.schema, column.table, column.column
    );
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
