use super::{expect_object, Args, Filter, Json, JsonMap, OrderBy};

use kiln_core::{
    schema::{Field, Model},
    Error, Result, Schema,
};

/// What a read returns for each row, in output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Selection {
    pub(crate) items: Vec<Selected>,

    /// Rows of a delegate base also carry their concrete subtype's fields.
    pub(crate) polymorphic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selected {
    Scalar(String),
    Relation { field: String, args: Box<ReadArgs> },
    Count(Vec<CountItem>),
}

/// One relation counted under `_count`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountItem {
    pub(crate) field: String,
    pub(crate) filter: Option<Filter>,
}

/// Arguments shared by every read: top-level finds and nested relation
/// selections.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ReadArgs {
    pub(crate) filter: Option<Filter>,
    pub(crate) selection: Selection,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) skip: Option<u64>,

    /// Negative values read from the end of the ordering.
    pub(crate) take: Option<i64>,
    pub(crate) distinct: Vec<String>,
}

impl Selection {
    /// Every scalar field of `model`, inherited ones first.
    pub(crate) fn scalars(model: &Model) -> Selection {
        let inherited = model.scalar_fields().filter(|field| field.is_inherited());
        let own = model.scalar_fields().filter(|field| !field.is_inherited());
        Selection {
            items: inherited
                .chain(own)
                .map(|field| Selected::Scalar(field.name.clone()))
                .collect(),
            polymorphic: model.is_delegate,
        }
    }

    /// Takes and parses `select`, `include` and `omit`.
    pub(crate) fn take(schema: &Schema, model: &Model, args: &mut Args) -> Result<Selection> {
        let select = args.take("select").filter(|v| !v.is_null());
        let include = args.take("include").filter(|v| !v.is_null());
        let omit = args.take("omit").filter(|v| !v.is_null());
        Selection::parse(schema, model, select, include, omit)
    }

    pub(crate) fn parse(
        schema: &Schema,
        model: &Model,
        select: Option<Json>,
        include: Option<Json>,
        omit: Option<Json>,
    ) -> Result<Selection> {
        let omitted = match &omit {
            Some(json) => omitted_fields(model, json)?,
            None => vec![],
        };

        match (select, include) {
            (Some(_), Some(_)) => Err(Error::invalid_argument(
                "`select` and `include` cannot be used together",
            )),
            (Some(_), None) if omit.is_some() => Err(Error::invalid_argument(
                "`select` and `omit` cannot be used together",
            )),
            (Some(select), None) => {
                let mut selection = Selection::default();
                for (key, value) in expect_object(&select, "`select`")? {
                    if let Some(item) = selected(schema, model, key, value, true)? {
                        selection.items.push(item);
                    }
                }
                Ok(selection)
            }
            (None, include) => {
                let mut selection = Selection::scalars(model);
                selection
                    .items
                    .retain(|item| !matches!(item, Selected::Scalar(name) if omitted.contains(name)));
                if let Some(include) = include {
                    for (key, value) in expect_object(&include, "`include`")? {
                        if let Some(item) = selected(schema, model, key, value, false)? {
                            selection.items.push(item);
                        }
                    }
                }
                Ok(selection)
            }
        }
    }

    pub(crate) fn scalar_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().filter_map(|item| match item {
            Selected::Scalar(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub(crate) fn contains_scalar(&self, name: &str) -> bool {
        self.scalar_names().any(|n| n == name)
    }
}

fn omitted_fields(model: &Model, json: &Json) -> Result<Vec<String>> {
    let mut out = vec![];
    for (key, value) in expect_object(json, "`omit`")? {
        let field = model.require_field(key)?;
        if field.is_relation() {
            return Err(Error::invalid_argument(format!(
                "relation `{}` cannot be omitted; leave it out of `include` instead",
                field.name
            )));
        }
        if value.as_bool() == Some(true) {
            out.push(field.name.clone());
        }
    }
    Ok(out)
}

fn selected(schema: &Schema, model: &Model, key: &str, value: &Json, select: bool) -> Result<Option<Selected>> {
    if value == &Json::Bool(false) || value.is_null() {
        return Ok(None);
    }

    if key == "_count" {
        return count(schema, model, value).map(Some);
    }

    let field = model.require_field(key)?;
    if !field.is_relation() {
        if !select {
            return Err(Error::invalid_argument(format!(
                "`include` only accepts relations, `{}` is a scalar field",
                field.name
            )));
        }
        if value != &Json::Bool(true) {
            return Err(Error::invalid_argument(format!(
                "scalar field `{}` must be selected with `true`",
                field.name
            )));
        }
        return Ok(Some(Selected::Scalar(field.name.clone())));
    }

    let target = schema.relation_target(field)?;
    let args = match value {
        Json::Bool(true) => ReadArgs::all(target),
        Json::Object(map) => ReadArgs::nested(schema, target, field, map)?,
        other => {
            return Err(Error::invalid_argument(format!(
                "relation `{}` must be selected with `true` or an object, got `{other}`",
                field.name
            )))
        }
    };
    Ok(Some(Selected::Relation {
        field: field.name.clone(),
        args: Box::new(args),
    }))
}

/// `_count: true` counts every to-many relation; `_count: { select: { posts:
/// true | { where } } }` picks them.
fn count(schema: &Schema, model: &Model, value: &Json) -> Result<Selected> {
    if value == &Json::Bool(true) {
        let items = model
            .relation_fields()
            .filter(|field| field.is_to_many())
            .map(|field| CountItem {
                field: field.name.clone(),
                filter: None,
            })
            .collect();
        return Ok(Selected::Count(items));
    }

    let map = expect_object(value, "`_count`")?;
    let select = map
        .get("select")
        .ok_or_else(|| Error::invalid_argument("`_count` expects `true` or `{ select }`"))?;

    let mut items = vec![];
    for (key, value) in expect_object(select, "`_count.select`")? {
        let field = model.require_field(key)?;
        if !field.is_to_many() {
            return Err(Error::invalid_argument(format!(
                "`_count` only applies to to-many relations, not `{}`",
                field.name
            )));
        }
        let filter = match value {
            Json::Bool(false) => continue,
            Json::Bool(true) => None,
            Json::Object(nested) => match nested.get("where") {
                Some(filter) => Some(Filter::parse(schema, schema.relation_target(field)?, filter)?),
                None => None,
            },
            other => {
                return Err(Error::invalid_argument(format!(
                    "`_count.select.{key}` must be a boolean or `{{ where }}`, got `{other}`"
                )))
            }
        };
        items.push(CountItem {
            field: field.name.clone(),
            filter,
        });
    }
    Ok(Selected::Count(items))
}

impl ReadArgs {
    /// All scalars, no filter.
    pub(crate) fn all(model: &Model) -> ReadArgs {
        ReadArgs {
            selection: Selection::scalars(model),
            ..ReadArgs::default()
        }
    }

    /// Takes every read argument out of `args`.
    pub(crate) fn take(schema: &Schema, model: &Model, args: &mut Args) -> Result<ReadArgs> {
        let filter = match args.take("where") {
            None | Some(Json::Null) => None,
            Some(json) => Some(Filter::parse(schema, model, &json)?),
        };
        let selection = Selection::take(schema, model, args)?;
        let order_by = OrderBy::take(schema, model, args)?;
        let skip = args.take_u64("skip")?;
        let take = args.take_i64("take")?;
        let distinct = match args.take("distinct") {
            None | Some(Json::Null) => vec![],
            Some(json) => distinct(model, json)?,
        };

        Ok(ReadArgs {
            filter,
            selection,
            order_by,
            skip,
            take,
            distinct,
        })
    }

    fn nested(schema: &Schema, target: &Model, field: &Field, map: &JsonMap) -> Result<ReadArgs> {
        let mut args = Args::from(map.clone());
        let read = if field.is_to_many() {
            ReadArgs::take(schema, target, &mut args)?
        } else {
            ReadArgs {
                selection: Selection::take(schema, target, &mut args)?,
                ..ReadArgs::default()
            }
        };
        args.finish(&format!("relation `{}`", field.name))?;
        Ok(read)
    }

    pub(crate) fn is_paginated(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }
}

fn distinct(model: &Model, json: Json) -> Result<Vec<String>> {
    super::one_or_many(json)
        .into_iter()
        .map(|item| {
            let name = item.as_str().ok_or_else(|| {
                Error::invalid_argument(format!("`distinct` entries must be field names, got `{item}`"))
            })?;
            let field = model.require_field(name)?;
            if field.is_relation() {
                return Err(Error::invalid_argument(format!(
                    "`distinct` cannot use relation `{name}`"
                )));
            }
            Ok(field.name.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_util::blog;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(model: &str, json: Json) -> Result<ReadArgs> {
        let schema = blog();
        let model = schema.model(model).unwrap();
        let mut args = Args::new(json).unwrap();
        let read = ReadArgs::take(&schema, model, &mut args)?;
        args.finish("findMany")?;
        Ok(read)
    }

    #[test]
    fn default_selection_is_every_scalar() {
        let read = parse("User", json!({})).unwrap();
        let names: Vec<_> = read.selection.scalar_names().collect();
        assert_eq!(names, vec!["id", "email", "name", "score", "balance"]);
        assert!(!read.selection.polymorphic);
    }

    #[test]
    fn include_with_omit() {
        let read = parse("User", json!({ "include": { "posts": { "take": 2 } }, "omit": { "balance": true } })).unwrap();
        let items = &read.selection.items;
        assert_eq!(items.len(), 5);
        assert!(!read.selection.contains_scalar("balance"));
        let Selected::Relation { field, args } = &items[4] else {
            panic!("expected relation, got {:?}", items[4]);
        };
        assert_eq!(field, "posts");
        assert_eq!(args.take, Some(2));
    }

    #[test]
    fn select_and_include_conflict() {
        let err = parse("User", json!({ "select": { "id": true }, "include": { "posts": true } })).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = parse("User", json!({ "select": { "id": true }, "omit": { "email": true } })).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn count_selection() {
        let read = parse(
            "User",
            json!({ "select": { "_count": { "select": { "posts": { "where": { "published": true } } } } } }),
        )
        .unwrap();
        let Selected::Count(items) = &read.selection.items[0] else {
            panic!("expected _count");
        };
        assert_eq!(items[0].field, "posts");
        assert!(items[0].filter.is_some());
    }

    #[test]
    fn delegate_bases_read_polymorphically() {
        let read = parse("Asset", json!({})).unwrap();
        assert!(read.selection.polymorphic);
        let read = parse("Asset", json!({ "select": { "id": true } })).unwrap();
        assert!(!read.selection.polymorphic);
    }

    #[test]
    fn to_one_relation_rejects_pagination() {
        let err = parse("Post", json!({ "include": { "author": { "take": 1 } } })).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn distinct_fields() {
        let read = parse("User", json!({ "distinct": "name" })).unwrap();
        assert_eq!(read.distinct, vec!["name".to_string()]);
        assert!(parse("User", json!({ "distinct": ["posts"] })).is_err());
    }
}
