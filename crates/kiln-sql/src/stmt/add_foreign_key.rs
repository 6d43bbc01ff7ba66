use super::ForeignKey;

/// `ALTER TABLE .. ADD CONSTRAINT .. FOREIGN KEY`, used where tables are
/// created before their constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct AddForeignKey {
    pub table: String,
    pub name: String,
    pub foreign_key: ForeignKey,
}
