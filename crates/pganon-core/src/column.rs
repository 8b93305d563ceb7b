use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A fully-qualified column reference: `schema.table.column`.
///
/// Used both as a dictionary/ordering key and as the user-facing identifier
/// in error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// `schema.table`, used when grouping columns by relation.
    pub fn table_key(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

impl FromStr for ColumnRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::config(format!(
                "invalid column reference {s:?}: expected schema.table.column"
            )));
        }
        Ok(ColumnRef::new(parts[0], parts[1], parts[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_part_reference() {
        let col: ColumnRef = "public.users.email".parse().unwrap();
        assert_eq!(col.schema, "public");
        assert_eq!(col.table, "users");
        assert_eq!(col.column, "email");
        assert_eq!(col.to_string(), "public.users.email");
    }

    #[test]
    fn rejects_missing_or_empty_parts() {
        assert!("users.email".parse::<ColumnRef>().is_err());
        assert!("a.b.c.d".parse::<ColumnRef>().is_err());
        assert!("public..email".parse::<ColumnRef>().is_err());
    }
}
