use super::{FieldDefault, FieldType, RelationInfo};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Filled in from the model's field map key.
    #[serde(skip)]
    pub name: String,

    #[serde(rename = "type")]
    pub ty: FieldType,

    #[serde(default)]
    pub array: bool,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub id: bool,

    /// Set to the current time on every update that changes the row.
    #[serde(default)]
    pub updated_at: bool,

    #[serde(default)]
    pub default: Option<FieldDefault>,

    #[serde(default)]
    pub relation: Option<RelationInfo>,

    /// Relation fields this scalar stores the foreign key for.
    #[serde(default)]
    pub foreign_key_for: Vec<String>,

    /// Delegate base the field is inherited from.
    #[serde(default)]
    pub origin_model: Option<String>,
}

/// What a field name refers to in an operation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Scalar,
    ForeignKey,
    Relation,
}

impl Field {
    pub fn role(&self) -> FieldRole {
        if self.is_relation() {
            FieldRole::Relation
        } else if !self.foreign_key_for.is_empty() {
            FieldRole::ForeignKey
        } else {
            FieldRole::Scalar
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.ty, FieldType::Model(_))
    }

    pub fn is_to_many(&self) -> bool {
        self.is_relation() && self.array
    }

    pub fn is_inherited(&self) -> bool {
        self.origin_model.is_some()
    }

    /// Returns true if the field is stored as a column of `model`'s own table.
    pub(crate) fn is_column_of_own_table(&self) -> bool {
        !self.is_relation() && (self.origin_model.is_none() || self.id)
    }
}
