use super::{Field, UniqueFieldSet};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Filled in from the schema's model map key.
    #[serde(skip)]
    pub name: String,

    pub fields: IndexMap<String, Field>,

    #[serde(default)]
    pub id_fields: Vec<String>,

    /// Named unique constraints. Ids and `unique` fields are added at load.
    #[serde(default)]
    pub unique_fields: IndexMap<String, UniqueFieldSet>,

    #[serde(default)]
    pub base_model: Option<String>,

    #[serde(default)]
    pub is_delegate: bool,

    #[serde(default)]
    pub sub_models: Vec<String>,

    /// Field recording the concrete sub-model of each row. Only set on
    /// delegate bases.
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl Model {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Looks up a field by name, failing with a usage error when missing.
    pub fn require_field(&self, name: &str) -> Result<&Field> {
        self.field(name).ok_or_else(|| {
            Error::invalid_argument(format!("unknown field `{name}` on model `{}`", self.name))
        })
    }

    pub fn id_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.id_fields.iter().filter_map(|name| self.field(name))
    }

    /// Non-relation fields, inherited ones included.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values().filter(|field| !field.is_relation())
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values().filter(|field| field.is_relation())
    }

    /// Fields stored in this model's own table.
    pub fn table_columns(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields
            .values()
            .filter(|field| field.is_column_of_own_table())
    }

    /// Name of the table storing the model.
    pub fn table_name(&self) -> &str {
        &self.name
    }

    pub fn has_base(&self) -> bool {
        self.base_model.is_some()
    }

    /// Returns true if `fields` covers at least one complete unique set.
    pub fn covers_unique_set(&self, mut has: impl FnMut(&str) -> bool) -> bool {
        self.unique_fields
            .values()
            .any(|set| set.fields().iter().all(|field| has(field)))
    }

    pub(super) fn link_unique_fields(&mut self) {
        let mut sets = IndexMap::new();

        let id_set = match &self.id_fields[..] {
            [single] => UniqueFieldSet::Single(single.clone()),
            many => UniqueFieldSet::Compound(many.to_vec()),
        };
        if !self.id_fields.is_empty() {
            sets.insert(self.id_fields.join("_"), id_set);
        }

        for field in self.fields.values() {
            if field.unique && !field.is_relation() && !sets.contains_key(&field.name) {
                sets.insert(field.name.clone(), UniqueFieldSet::Single(field.name.clone()));
            }
        }

        for (name, set) in std::mem::take(&mut self.unique_fields) {
            sets.entry(name).or_insert(set);
        }

        self.unique_fields = sets;
    }
}
