use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprColumn {
    /// Table alias (or table name) qualifying the column.
    pub table: Option<String>,
    pub name: String,
}

impl Expr {
    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        ExprColumn {
            table: Some(table.into()),
            name: name.into(),
        }
        .into()
    }

    pub fn bare_column(name: impl Into<String>) -> Self {
        ExprColumn {
            table: None,
            name: name.into(),
        }
        .into()
    }

    pub fn as_column(&self) -> Option<&ExprColumn> {
        match self {
            Self::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl From<ExprColumn> for Expr {
    fn from(value: ExprColumn) -> Self {
        Self::Column(value)
    }
}
