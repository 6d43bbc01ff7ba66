use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,

    /// Empty inserts a row of defaults.
    pub columns: Vec<String>,

    /// One entry per row, each with one expression per column.
    pub rows: Vec<Vec<Expr>>,

    pub on_conflict: Option<OnConflict>,

    pub returning: Vec<SelectItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Skip rows violating a unique constraint.
    DoNothing,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Insert {
            table: table.into(),
            columns: vec![],
            rows: vec![],
            on_conflict: None,
            returning: vec![],
        }
    }

    /// Returns true if any row contains a `DEFAULT` placeholder.
    pub fn uses_default(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.iter().any(|expr| matches!(expr, Expr::Default)))
    }
}
