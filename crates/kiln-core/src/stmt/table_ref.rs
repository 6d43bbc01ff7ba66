use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Table {
        name: String,
        alias: Option<String>,
    },

    Subquery {
        select: Box<Select>,
        alias: String,
    },

    /// Rows of a JSON array column (`json_each`)
    JsonEach {
        expr: Box<Expr>,
        alias: String,
    },
}

impl TableRef {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        TableRef::Table {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    pub fn subquery(select: Select, alias: impl Into<String>) -> Self {
        TableRef::Subquery {
            select: Box::new(select),
            alias: alias.into(),
        }
    }

    /// The name columns of this source are qualified with.
    pub fn qualifier(&self) -> &str {
        match self {
            TableRef::Table { alias: Some(alias), .. } => alias,
            TableRef::Table { name, .. } => name,
            TableRef::Subquery { alias, .. } | TableRef::JsonEach { alias, .. } => alias,
        }
    }
}
