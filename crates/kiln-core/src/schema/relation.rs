use crate::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationInfo {
    #[serde(default)]
    pub name: Option<String>,

    /// Foreign-key fields on this model; empty when the other side owns the
    /// key.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Fields on the target referenced by `fields`, pairwise.
    #[serde(default)]
    pub references: Vec<String>,

    #[serde(default)]
    pub opposite: Option<String>,

    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,

    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    SetDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOwner {
    /// The model the relation was resolved from holds the foreign key.
    This,

    /// The related model holds the foreign key.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub fk: String,
    pub pk: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationKeys {
    pub owner: RelationOwner,
    pub pairs: Vec<KeyPair>,
}

impl RelationKeys {
    pub(super) fn from_info(owner: RelationOwner, info: &RelationInfo, model: &str, field: &str) -> Result<Self> {
        if info.fields.len() != info.references.len() {
            return Err(Error::invalid_schema(format!(
                "relation `{model}.{field}` has {} fields but {} references",
                info.fields.len(),
                info.references.len()
            )));
        }

        let pairs = info
            .fields
            .iter()
            .zip(&info.references)
            .map(|(fk, pk)| KeyPair {
                fk: fk.clone(),
                pk: pk.clone(),
            })
            .collect();

        Ok(RelationKeys { owner, pairs })
    }

    pub fn owned_by_this(&self) -> bool {
        self.owner == RelationOwner::This
    }

    pub fn fk_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.pairs.iter().map(|pair| pair.fk.as_str())
    }

    pub fn pk_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.pairs.iter().map(|pair| pair.pk.as_str())
    }
}
