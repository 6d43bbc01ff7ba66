use serde::Deserialize;

/// A named unique constraint: one field, or a compound list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UniqueFieldSet {
    Single(String),
    Compound(Vec<String>),
}

impl UniqueFieldSet {
    pub fn fields(&self) -> &[String] {
        match self {
            UniqueFieldSet::Single(field) => std::slice::from_ref(field),
            UniqueFieldSet::Compound(fields) => fields,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, UniqueFieldSet::Compound(fields) if fields.len() > 1)
    }
}
