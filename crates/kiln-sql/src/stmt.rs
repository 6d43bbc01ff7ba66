mod add_foreign_key;
pub use add_foreign_key::AddForeignKey;

mod column_def;
pub use column_def::{ColumnDef, ColumnType};

mod create_table;
pub use create_table::{CreateTable, ForeignKey};

mod schema;

pub use kiln_core::stmt::*;

/// A statement the serializer understands: row-level queries plus the DDL
/// needed to push a schema.
#[derive(Debug, Clone)]
pub enum Statement {
    Query(kiln_core::stmt::Statement),
    CreateTable(CreateTable),
    AddForeignKey(AddForeignKey),
}

impl Statement {
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Query(_))
    }

    pub fn as_query(&self) -> Option<&kiln_core::stmt::Statement> {
        match self {
            Statement::Query(stmt) => Some(stmt),
            _ => None,
        }
    }
}

impl From<kiln_core::stmt::Statement> for Statement {
    fn from(value: kiln_core::stmt::Statement) -> Self {
        Statement::Query(value)
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Query(value.into())
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Statement::Query(value.into())
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Statement::Query(value.into())
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Statement::Query(value.into())
    }
}
