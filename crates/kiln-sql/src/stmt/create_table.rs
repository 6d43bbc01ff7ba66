use super::ColumnDef;
use kiln_core::schema::ReferentialAction;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    /// Name of the table
    pub name: String,

    /// Column definitions
    pub columns: Vec<ColumnDef>,

    /// Primary key columns
    pub primary_key: Vec<String>,

    /// Unique constraints, one entry per column set
    pub unique: Vec<Vec<String>>,

    /// Foreign keys declared inline with the table
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl CreateTable {
    /// The primary key column, when it is a single auto-incrementing one.
    pub fn auto_increment_key(&self) -> Option<&ColumnDef> {
        match &self.primary_key[..] {
            [pk] => self
                .columns
                .iter()
                .find(|column| &column.name == pk && column.ty.auto_increment),
            _ => None,
        }
    }
}
