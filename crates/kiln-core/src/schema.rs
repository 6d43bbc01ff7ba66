mod default;
pub use default::{DefaultCall, FieldDefault, Generator};

mod enum_def;
pub use enum_def::EnumDef;

mod field;
pub use field::{Field, FieldRole};

mod many_to_many;
pub use many_to_many::ManyToMany;

mod model;
pub use model::Model;

mod relation;
pub use relation::{KeyPair, ReferentialAction, RelationInfo, RelationKeys, RelationOwner};

mod ty;
pub use ty::{FieldType, ScalarType};

mod unique;
pub use unique::UniqueFieldSet;

mod verify;

use crate::Result;
use indexmap::IndexMap;
use serde::Deserialize;

/// The validated description of every model the engine can operate on.
///
/// Loaded once, never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub models: IndexMap<String, Model>,

    #[serde(default)]
    pub enums: IndexMap<String, EnumDef>,
}

impl Schema {
    /// Parses and verifies a schema description from JSON text.
    pub fn from_json(json: &str) -> Result<Schema> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Schema::from_value(value)
    }

    /// Builds and verifies a schema description from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Schema> {
        let mut schema: Schema = serde_json::from_value(value)
            .map_err(|err| crate::Error::invalid_schema(err.to_string()))?;
        schema.link();
        verify::verify(&schema)?;
        Ok(schema)
    }

    /// Fills in everything the description leaves implicit: names from map
    /// keys, enum references, inherited delegate fields, sub-model lists and
    /// unique field sets.
    fn link(&mut self) {
        for (name, model) in &mut self.models {
            model.name = name.clone();
            for (field_name, field) in &mut model.fields {
                field.name = field_name.clone();
                if let FieldType::Model(target) = &field.ty {
                    if self.enums.contains_key(target) {
                        field.ty = FieldType::Enum(target.clone());
                    }
                }
            }
        }

        for (name, def) in &mut self.enums {
            def.name = name.clone();
        }

        // Inherit base fields, outermost base first so chains resolve fully.
        let names: Vec<String> = self.models.keys().cloned().collect();
        for name in &names {
            let chain = self.base_names(name);
            for base in chain.iter().rev() {
                let Some(base_fields) = self.models.get(base).map(|m| m.fields.clone()) else {
                    continue;
                };
                let Some(model) = self.models.get_mut(name) else {
                    continue;
                };
                for (field_name, field) in base_fields {
                    if model.fields.contains_key(&field_name) {
                        continue;
                    }
                    let mut inherited = field;
                    if inherited.origin_model.is_none() {
                        inherited.origin_model = Some(base.clone());
                    }
                    model.fields.insert(field_name, inherited);
                }
                // Ids are inherited with the base's order.
                if model.id_fields.is_empty() {
                    if let Some(ids) = self.models.get(base).map(|m| m.id_fields.clone()) {
                        if let Some(model) = self.models.get_mut(name) {
                            model.id_fields = ids;
                        }
                    }
                }
            }
        }

        for name in &names {
            let Some(base) = self.models[name].base_model.clone() else {
                continue;
            };
            if let Some(base) = self.models.get_mut(&base) {
                if !base.sub_models.contains(name) {
                    base.sub_models.push(name.clone());
                }
            }
        }

        for model in self.models.values_mut() {
            model.link_unique_fields();
        }
    }

    fn base_names(&self, name: &str) -> Vec<String> {
        let mut chain = vec![];
        let mut current = self.models.get(name).and_then(|m| m.base_model.clone());
        while let Some(base) = current {
            if chain.contains(&base) {
                break;
            }
            current = self.models.get(&base).and_then(|m| m.base_model.clone());
            chain.push(base);
        }
        chain
    }

    /// Looks up a model by name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Looks up a model by name, failing with a usage error when missing.
    pub fn require_model(&self, name: &str) -> Result<&Model> {
        self.model(name)
            .ok_or_else(|| crate::Error::invalid_argument(format!("unknown model `{name}`")))
    }

    /// Resolves the target model of a relation field.
    pub fn relation_target(&self, field: &Field) -> Result<&Model> {
        match &field.ty {
            FieldType::Model(target) => self.model(target).ok_or_else(|| {
                crate::Error::invalid_schema(format!(
                    "field `{}` references unknown model `{target}`",
                    field.name
                ))
            }),
            _ => Err(crate::Error::invalid_schema(format!(
                "field `{}` is not a relation",
                field.name
            ))),
        }
    }

    /// Returns the opposite relation field on the target model.
    pub fn opposite_field<'a>(&'a self, model: &Model, field: &Field) -> Result<(&'a Model, &'a Field)> {
        let target = self.relation_target(field)?;
        let relation = field.relation.as_ref();

        if let Some(opposite) = relation.and_then(|r| r.opposite.as_deref()) {
            if let Some(found) = target.field(opposite) {
                return Ok((target, found));
            }
        }

        // Fall back to the field on the target that points back at this one.
        let found = target.fields.values().find(|candidate| {
            candidate.ty.model_name() == Some(model.name.as_str())
                && !std::ptr::eq(*candidate, field)
                && match (candidate.relation.as_ref(), relation) {
                    (Some(c), Some(r)) if c.name.is_some() || r.name.is_some() => c.name == r.name,
                    (Some(c), _) => c.opposite.as_deref().map_or(true, |o| o == field.name),
                    _ => false,
                }
        });

        found.map(|found| (target, found)).ok_or_else(|| {
            crate::Error::invalid_schema(format!(
                "relation `{}.{}` has no opposite field on `{}`",
                model.name, field.name, target.name
            ))
        })
    }

    /// Foreign-key pairs of a relation and which side owns them.
    ///
    /// When `field` owns the key, each pair's `fk` is a field on `model` and
    /// `pk` a field on the target; otherwise `fk` lives on the target and
    /// `pk` on `model`.
    pub fn relation_keys(&self, model: &Model, field: &Field) -> Result<RelationKeys> {
        let relation = field.relation.as_ref().ok_or_else(|| {
            crate::Error::invalid_schema(format!(
                "field `{}.{}` has no relation information",
                model.name, field.name
            ))
        })?;

        if !relation.fields.is_empty() {
            return RelationKeys::from_info(RelationOwner::This, relation, &model.name, &field.name);
        }

        let (target, opposite) = self.opposite_field(model, field)?;
        match opposite.relation.as_ref() {
            Some(info) if !info.fields.is_empty() => {
                RelationKeys::from_info(RelationOwner::Other, info, &target.name, &opposite.name)
            }
            _ => Err(crate::Error::invalid_schema(format!(
                "relation `{}.{}` has no foreign key on either side",
                model.name, field.name
            ))),
        }
    }

    /// Implicit join table of a many-to-many relation, or `None` when the
    /// relation is backed by a foreign key.
    pub fn many_to_many(&self, model: &Model, field: &Field) -> Result<Option<ManyToMany>> {
        if !field.is_to_many() {
            return Ok(None);
        }
        let (target, opposite) = self.opposite_field(model, field)?;
        if !opposite.array {
            return Ok(None);
        }
        let owns = |f: &Field| f.relation.as_ref().is_some_and(|r| !r.fields.is_empty());
        if owns(field) || owns(opposite) {
            return Ok(None);
        }
        ManyToMany::resolve(model, field, target, opposite).map(Some)
    }

    /// Delegate ancestors of `model`, nearest first.
    pub fn base_chain<'a>(&'a self, model: &Model) -> Vec<&'a Model> {
        let mut chain: Vec<&Model> = vec![];
        let mut current = model.base_model.as_deref();
        while let Some(name) = current {
            let Some(base) = self.model(name) else { break };
            if chain.iter().any(|m| m.name == base.name) {
                break;
            }
            chain.push(base);
            current = base.base_model.as_deref();
        }
        chain
    }

    /// The root of the delegate hierarchy `model` belongs to.
    pub fn root_model<'a>(&'a self, model: &'a Model) -> &'a Model {
        self.base_chain(model).last().copied().unwrap_or(model)
    }

    /// Every transitive sub-model of `model`, depth-first.
    pub fn descendants<'a>(&'a self, model: &Model) -> Vec<&'a Model> {
        let mut out = vec![];
        let mut stack: Vec<&str> = model.sub_models.iter().rev().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            let Some(sub) = self.model(name) else { continue };
            if out.iter().any(|m: &&Model| m.name == sub.name) {
                continue;
            }
            out.push(sub);
            stack.extend(sub.sub_models.iter().rev().map(String::as_str));
        }
        out
    }

    /// The discriminator field recording the concrete model of a row.
    pub fn discriminator<'a>(&'a self, model: &'a Model) -> Option<&'a Field> {
        std::iter::once(model)
            .chain(self.base_chain(model))
            .find_map(|m| m.discriminator.as_deref().and_then(|name| model.field(name)))
    }

    /// Returns true if `model` is `ancestor` or one of its sub-models.
    pub fn is_same_or_descendant(&self, model: &Model, ancestor: &Model) -> bool {
        model.name == ancestor.name || self.base_chain(model).iter().any(|m| m.name == ancestor.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "models": {
                "User": {
                    "fields": {
                        "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                        "email": { "type": "String", "unique": true },
                        "role": { "type": "Role", "default": "USER" },
                        "posts": { "type": "Post", "array": true, "relation": { "opposite": "author" } },
                        "tags": { "type": "Tag", "array": true, "relation": { "opposite": "users" } },
                        "assets": { "type": "Asset", "array": true, "relation": { "opposite": "owner" } }
                    },
                    "idFields": ["id"]
                },
                "Post": {
                    "fields": {
                        "id": { "type": "Int", "id": true },
                        "title": { "type": "String" },
                        "authorId": { "type": "Int", "optional": true, "foreignKeyFor": ["author"] },
                        "author": {
                            "type": "User",
                            "optional": true,
                            "relation": { "fields": ["authorId"], "references": ["id"], "opposite": "posts", "onDelete": "Cascade" }
                        }
                    },
                    "idFields": ["id"]
                },
                "Tag": {
                    "fields": {
                        "id": { "type": "Int", "id": true },
                        "users": { "type": "User", "array": true, "relation": { "opposite": "tags" } }
                    },
                    "idFields": ["id"]
                },
                "Asset": {
                    "fields": {
                        "id": { "type": "Int", "id": true },
                        "kind": { "type": "String" },
                        "ownerId": { "type": "Int", "foreignKeyFor": ["owner"] },
                        "owner": { "type": "User", "relation": { "fields": ["ownerId"], "references": ["id"], "opposite": "assets" } }
                    },
                    "idFields": ["id"],
                    "isDelegate": true,
                    "discriminator": "kind"
                },
                "Video": {
                    "fields": { "duration": { "type": "Int" } },
                    "idFields": ["id"],
                    "baseModel": "Asset"
                }
            },
            "enums": {
                "Role": { "values": ["USER", "ADMIN"] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn names_and_enums_are_linked() {
        let schema = schema();
        let user = schema.model("User").unwrap();
        assert_eq!(user.name, "User");
        assert_eq!(user.field("role").unwrap().ty, FieldType::Enum("Role".into()));
        assert_eq!(user.field("email").unwrap().role(), FieldRole::Scalar);
        assert_eq!(user.field("posts").unwrap().role(), FieldRole::Relation);
        let post = schema.model("Post").unwrap();
        assert_eq!(post.field("authorId").unwrap().role(), FieldRole::ForeignKey);
    }

    #[test]
    fn relation_keys_owning_and_opposite_side() {
        let schema = schema();
        let post = schema.model("Post").unwrap();
        let keys = schema.relation_keys(post, post.field("author").unwrap()).unwrap();
        assert_eq!(keys.owner, RelationOwner::This);
        assert_eq!(keys.pairs, vec![KeyPair { fk: "authorId".into(), pk: "id".into() }]);

        let user = schema.model("User").unwrap();
        let keys = schema.relation_keys(user, user.field("posts").unwrap()).unwrap();
        assert_eq!(keys.owner, RelationOwner::Other);
        assert_eq!(keys.pairs, vec![KeyPair { fk: "authorId".into(), pk: "id".into() }]);
    }

    #[test]
    fn many_to_many_join_table_is_symmetric() {
        let schema = schema();
        let user = schema.model("User").unwrap();
        let tag = schema.model("Tag").unwrap();

        let from_tag = schema.many_to_many(tag, tag.field("users").unwrap()).unwrap().unwrap();
        let from_user = schema.many_to_many(user, user.field("tags").unwrap()).unwrap().unwrap();

        assert_eq!(from_tag.join_table, "_TagToUser");
        assert_eq!(from_user.join_table, "_TagToUser");
        assert_eq!(from_tag.parent_column, "A");
        assert_eq!(from_user.parent_column, "B");
        assert_eq!(from_tag.other_column, from_user.parent_column);

        assert!(schema.many_to_many(user, user.field("posts").unwrap()).unwrap().is_none());
    }

    #[test]
    fn delegate_fields_are_inherited() {
        let schema = schema();
        let video = schema.model("Video").unwrap();
        let asset = schema.model("Asset").unwrap();

        assert_eq!(video.id_fields, vec!["id".to_string()]);
        assert_eq!(video.field("kind").unwrap().origin_model.as_deref(), Some("Asset"));
        assert!(video.field("duration").unwrap().origin_model.is_none());
        assert_eq!(schema.discriminator(video).unwrap().name, "kind");
        assert_eq!(schema.root_model(video).name, "Asset");
        assert_eq!(asset.sub_models, vec!["Video".to_string()]);
        assert_eq!(schema.descendants(asset).len(), 1);

        let columns: Vec<_> = video.table_columns().map(|f| f.name.as_str()).collect();
        assert_eq!(columns, vec!["duration", "id"]);
    }

    #[test]
    fn unique_sets_include_ids_and_unique_fields() {
        let schema = schema();
        let user = schema.model("User").unwrap();
        let sets: Vec<_> = user.unique_fields.keys().map(String::as_str).collect();
        assert_eq!(sets, vec!["id", "email"]);
    }

    #[test]
    fn missing_foreign_key_is_a_schema_error() {
        let err = Schema::from_value(json!({
            "models": {
                "A": {
                    "fields": {
                        "id": { "type": "Int", "id": true },
                        "b": { "type": "B", "relation": { "opposite": "a" } }
                    },
                    "idFields": ["id"]
                },
                "B": {
                    "fields": {
                        "id": { "type": "Int", "id": true },
                        "a": { "type": "A", "relation": { "opposite": "b" } }
                    },
                    "idFields": ["id"]
                }
            }
        }))
        .unwrap_err();
        assert!(err.is_invalid_schema());
    }
}
