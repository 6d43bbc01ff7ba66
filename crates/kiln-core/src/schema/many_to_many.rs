use super::{Field, Model};
use crate::{Error, Result};

/// The implicit join table backing a many-to-many relation, seen from one
/// side.
///
/// Column `A` references the model whose name sorts first (for
/// self-relations, the side whose field name sorts first); `B` the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManyToMany {
    pub join_table: String,

    /// Join column referencing the model the relation is read from.
    pub parent_column: &'static str,

    /// Id field of the model the relation is read from.
    pub parent_id: String,

    /// Join column referencing the related model.
    pub other_column: &'static str,

    /// Id field of the related model.
    pub other_id: String,
}

impl ManyToMany {
    pub(super) fn resolve(model: &Model, field: &Field, target: &Model, opposite: &Field) -> Result<Self> {
        let parent_id = single_id(model)?;
        let other_id = single_id(target)?;

        let this_first = (model.name.as_str(), field.name.as_str())
            <= (target.name.as_str(), opposite.name.as_str());

        let join_table = match field.relation.as_ref().and_then(|r| r.name.as_deref()) {
            Some(name) => format!("_{name}"),
            None => {
                let (first, second) = if model.name <= target.name {
                    (&model.name, &target.name)
                } else {
                    (&target.name, &model.name)
                };
                format!("_{first}To{second}")
            }
        };

        let (parent_column, other_column) = if this_first { ("A", "B") } else { ("B", "A") };

        Ok(ManyToMany {
            join_table,
            parent_column,
            parent_id,
            other_column,
            other_id,
        })
    }
}

fn single_id(model: &Model) -> Result<String> {
    match &model.id_fields[..] {
        [id] => Ok(id.clone()),
        _ => Err(Error::invalid_schema(format!(
            "many-to-many relations require a single id field on `{}`",
            model.name
        ))),
    }
}
