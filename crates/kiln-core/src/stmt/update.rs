use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,

    pub assignments: Vec<Assignment>,

    pub filter: Option<Expr>,

    pub returning: Vec<SelectItem>,

    /// Only serialized on backends with bounded UPDATE.
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Self {
        Update {
            table: table.into(),
            assignments: vec![],
            filter: None,
            returning: vec![],
            limit: None,
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Expr>) {
        let column = column.into();
        let value = value.into();
        match self.assignments.iter_mut().find(|a| a.column == column) {
            Some(existing) => existing.value = value,
            None => self.assignments.push(Assignment { column, value }),
        }
    }
}
