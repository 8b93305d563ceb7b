//! Foreign-key analysis: which configured columns will be rewritten by the
//! database itself via `ON UPDATE CASCADE`, and what order the rest must be
//! processed in.

use std::collections::{HashMap, HashSet};

use sqlx::postgres::PgPool;
use sqlx::Row;

use pganon_core::{ColumnRef, Error, Result};

/// Referential action attached to a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    Unknown,
}

impl FkAction {
    /// Convert a `pg_constraint` action code to the typed action.
    pub fn from_code(code: i8) -> FkAction {
        match code as u8 as char {
            'a' => FkAction::NoAction,
            'r' => FkAction::Restrict,
            'c' => FkAction::Cascade,
            'n' => FkAction::SetNull,
            'd' => FkAction::SetDefault,
            _ => FkAction::Unknown,
        }
    }
}

/// One foreign-key relationship between a child column and the parent column
/// it references.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub parent: ColumnRef,
    pub child: ColumnRef,
    pub on_update: FkAction,
    pub on_delete: FkAction,
}

/// Harvests foreign keys touching the configured tables.
pub struct FkAnalyzer<'a> {
    pool: &'a PgPool,
}

impl<'a> FkAnalyzer<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every FK whose parent or child table appears among the given columns.
    pub async fn analyze(&self, columns: &[ColumnRef]) -> Result<Vec<ForeignKey>> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let tables: HashSet<String> = columns.iter().map(ColumnRef::table_key).collect();

        let rows = sqlx::query(
            r#"
            SELECT
                c.conname,
                pn.nspname, pc.relname, pa.attname,
                cn.nspname, cc.relname, ca.attname,
                c.confupdtype, c.confdeltype
            FROM pg_constraint c
            JOIN pg_class pc ON pc.oid = c.confrelid
            JOIN pg_namespace pn ON pn.oid = pc.relnamespace
            JOIN pg_class cc ON cc.oid = c.conrelid
            JOIN pg_namespace cn ON cn.oid = cc.relnamespace
            JOIN pg_attribute pa ON pa.attrelid = c.confrelid
                AND pa.attnum = ANY(c.confkey)
            JOIN pg_attribute ca ON ca.attrelid = c.conrelid
                AND ca.attnum = ANY(c.conkey)
            WHERE c.contype = 'f'
            "#,
        )
        .fetch_all(self.pool)
        .await
        .map_err(|err| Error::database("fk_analyze", err))?;

        let mut fks = Vec::new();
        for row in rows {
            let fk = (|| -> std::result::Result<ForeignKey, sqlx::Error> {
                Ok(ForeignKey {
                    constraint_name: row.try_get(0)?,
                    parent: ColumnRef::new(
                        row.try_get::<String, _>(1)?,
                        row.try_get::<String, _>(2)?,
                        row.try_get::<String, _>(3)?,
                    ),
                    child: ColumnRef::new(
                        row.try_get::<String, _>(4)?,
                        row.try_get::<String, _>(5)?,
                        row.try_get::<String, _>(6)?,
                    ),
                    on_update: FkAction::from_code(row.try_get(7)?),
                    on_delete: FkAction::from_code(row.try_get(8)?),
                })
            })()
            .map_err(|err| Error::database("fk_analyze", err))?;

            if tables.contains(&fk.parent.table_key()) || tables.contains(&fk.child.table_key()) {
                fks.push(fk);
            }
        }

        Ok(fks)
    }

    /// Columns that will be rewritten by the database's own cascade when
    /// their parent is updated. These are skipped from direct processing.
    pub async fn cascade_targets(&self, columns: &[ColumnRef]) -> Result<Vec<ColumnRef>> {
        let fks = self.analyze(columns).await?;
        Ok(cascade_targets(&fks, columns))
    }

    /// Columns ordered so that every CASCADE parent precedes its child.
    pub async fn processing_order(&self, columns: &[ColumnRef]) -> Result<Vec<ColumnRef>> {
        let fks = self.analyze(columns).await?;
        processing_order(&fks, columns)
    }
}

/// Children of configured CASCADE parents. Pure so it can be tested without
/// a database.
pub fn cascade_targets(fks: &[ForeignKey], columns: &[ColumnRef]) -> Vec<ColumnRef> {
    let configured: HashSet<&ColumnRef> = columns.iter().collect();

    let mut targets = Vec::new();
    let mut seen = HashSet::new();
    for fk in fks {
        if fk.on_update == FkAction::Cascade
            && configured.contains(&fk.parent)
            && seen.insert(fk.child.clone())
        {
            targets.push(fk.child.clone());
        }
    }
    targets
}

/// Topological order over the CASCADE edges between configured columns,
/// parents first. Ties break in the caller's column order, which keeps the
/// result stable run to run. Cycles are rejected.
pub fn processing_order(fks: &[ForeignKey], columns: &[ColumnRef]) -> Result<Vec<ColumnRef>> {
    let configured: HashSet<&ColumnRef> = columns.iter().collect();

    // child -> parents, restricted to edges with both ends configured
    let mut parents: HashMap<&ColumnRef, Vec<&ColumnRef>> = HashMap::new();
    for fk in fks {
        if fk.on_update != FkAction::Cascade {
            continue;
        }
        let (Some(parent), Some(child)) = (
            configured.get(&fk.parent).copied(),
            configured.get(&fk.child).copied(),
        ) else {
            continue;
        };
        parents.entry(child).or_default().push(parent);
    }

    let mut order: Vec<ColumnRef> = Vec::with_capacity(columns.len());
    let mut visited: HashSet<&ColumnRef> = HashSet::new();
    let mut in_progress: HashSet<&ColumnRef> = HashSet::new();

    fn visit<'a>(
        col: &'a ColumnRef,
        parents: &HashMap<&'a ColumnRef, Vec<&'a ColumnRef>>,
        visited: &mut HashSet<&'a ColumnRef>,
        in_progress: &mut HashSet<&'a ColumnRef>,
        order: &mut Vec<ColumnRef>,
    ) -> Result<()> {
        if visited.contains(col) {
            return Ok(());
        }
        if !in_progress.insert(col) {
            return Err(Error::database_msg(
                "ordering",
                format!("circular CASCADE dependency detected at {col}"),
            ));
        }

        if let Some(deps) = parents.get(col) {
            for dep in deps {
                visit(dep, parents, visited, in_progress, order)?;
            }
        }

        in_progress.remove(col);
        visited.insert(col);
        order.push(col.clone());
        Ok(())
    }

    for col in columns {
        visit(col, &parents, &mut visited, &mut in_progress, &mut order)?;
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(s: &str) -> ColumnRef {
        s.parse().unwrap()
    }

    fn cascade_fk(parent: &str, child: &str) -> ForeignKey {
        ForeignKey {
            constraint_name: format!("fk_{}", child.replace('.', "_")),
            parent: col(parent),
            child: col(child),
            on_update: FkAction::Cascade,
            on_delete: FkAction::NoAction,
        }
    }

    #[test]
    fn action_codes_map_like_pg_constraint() {
        assert_eq!(FkAction::from_code(b'c' as i8), FkAction::Cascade);
        assert_eq!(FkAction::from_code(b'a' as i8), FkAction::NoAction);
        assert_eq!(FkAction::from_code(b'n' as i8), FkAction::SetNull);
        assert_eq!(FkAction::from_code(b'z' as i8), FkAction::Unknown);
    }

    #[test]
    fn cascade_child_is_a_skip_target() {
        let columns = vec![col("public.parents.name"), col("public.children.parent_name")];
        let fks = vec![cascade_fk("public.parents.name", "public.children.parent_name")];

        let targets = cascade_targets(&fks, &columns);
        assert_eq!(targets, vec![col("public.children.parent_name")]);
    }

    #[test]
    fn non_cascade_fk_is_not_a_target() {
        let columns = vec![col("public.parents.name"), col("public.children.parent_name")];
        let mut fk = cascade_fk("public.parents.name", "public.children.parent_name");
        fk.on_update = FkAction::NoAction;

        assert!(cascade_targets(&[fk], &columns).is_empty());
    }

    #[test]
    fn unconfigured_parent_does_not_skip_child() {
        let columns = vec![col("public.children.parent_name")];
        let fks = vec![cascade_fk("public.parents.name", "public.children.parent_name")];

        assert!(cascade_targets(&fks, &columns).is_empty());
    }

    #[test]
    fn parent_precedes_child_even_when_configured_after() {
        let columns = vec![
            col("public.children.parent_name"),
            col("public.parents.name"),
        ];
        let fks = vec![cascade_fk("public.parents.name", "public.children.parent_name")];

        let order = processing_order(&fks, &columns).unwrap();
        let parent_idx = order.iter().position(|c| c.table == "parents").unwrap();
        let child_idx = order.iter().position(|c| c.table == "children").unwrap();
        assert!(parent_idx < child_idx);
    }

    #[test]
    fn unrelated_columns_keep_input_order() {
        let columns = vec![
            col("public.b.x"),
            col("public.a.x"),
            col("public.c.x"),
        ];
        let order = processing_order(&[], &columns).unwrap();
        assert_eq!(order, columns);
    }

    #[test]
    fn chain_orders_transitively() {
        let columns = vec![
            col("public.c.x"),
            col("public.b.x"),
            col("public.a.x"),
        ];
        let fks = vec![
            cascade_fk("public.a.x", "public.b.x"),
            cascade_fk("public.b.x", "public.c.x"),
        ];

        let order = processing_order(&fks, &columns).unwrap();
        assert_eq!(
            order,
            vec![col("public.a.x"), col("public.b.x"), col("public.c.x")]
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let columns = vec![col("public.a.x"), col("public.b.x")];
        let fks = vec![
            cascade_fk("public.a.x", "public.b.x"),
            cascade_fk("public.b.x", "public.a.x"),
        ];

        let err = processing_order(&fks, &columns).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }
}
