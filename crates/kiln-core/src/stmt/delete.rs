use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,

    pub filter: Option<Expr>,

    pub returning: Vec<SelectItem>,

    /// Only serialized on backends with bounded DELETE.
    pub limit: Option<u64>,
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Self {
        Delete {
            table: table.into(),
            filter: None,
            returning: vec![],
            limit: None,
        }
    }
}
