use super::{expect_object, one_or_many, Filter, Json};
use crate::engine::coerce;

use indexmap::IndexMap;
use kiln_core::{
    schema::{Field, Model},
    stmt::Value,
    Error, Result, Schema,
};

/// The `data` of a create or update, split by field role.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Data {
    /// Scalar and foreign-key columns.
    pub(crate) scalars: IndexMap<String, ScalarWrite>,

    /// Nested relation writes, in payload order.
    pub(crate) relations: IndexMap<String, Vec<NestedAction>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScalarWrite {
    Set(Value),
    Increment(Value),
    Decrement(Value),
    Multiply(Value),
    Divide(Value),
    Push(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NestedAction {
    Create(Vec<Data>),
    CreateMany { data: Vec<Data>, skip_duplicates: bool },
    Connect(Vec<Filter>),
    ConnectOrCreate(Vec<(Filter, Data)>),
    Set(Vec<Filter>),

    /// For to-one relations an empty filter stands for "the linked row".
    Disconnect(Vec<Filter>),
    Delete(Vec<Filter>),
    Update(Vec<NestedUpdate>),
    UpdateMany(Vec<NestedUpdate>),
    DeleteMany(Vec<Filter>),
    Upsert(Vec<NestedUpsert>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NestedUpdate {
    pub(crate) filter: Filter,
    pub(crate) data: Data,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NestedUpsert {
    pub(crate) filter: Filter,
    pub(crate) create: Data,
    pub(crate) update: Data,
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Create,
    Update,
}

impl Data {
    pub(crate) fn parse_create(schema: &Schema, model: &Model, json: &Json) -> Result<Data> {
        Parser { schema }.data(model, json, Mode::Create)
    }

    pub(crate) fn parse_update(schema: &Schema, model: &Model, json: &Json) -> Result<Data> {
        Parser { schema }.data(model, json, Mode::Update)
    }

    /// The value assigned to `field` by a plain `set`, if any.
    pub(crate) fn set_value(&self, field: &str) -> Option<&Value> {
        match self.scalars.get(field) {
            Some(ScalarWrite::Set(value)) => Some(value),
            _ => None,
        }
    }
}

impl NestedAction {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            NestedAction::Create(_) => "create",
            NestedAction::CreateMany { .. } => "createMany",
            NestedAction::Connect(_) => "connect",
            NestedAction::ConnectOrCreate(_) => "connectOrCreate",
            NestedAction::Set(_) => "set",
            NestedAction::Disconnect(_) => "disconnect",
            NestedAction::Delete(_) => "delete",
            NestedAction::Update(_) => "update",
            NestedAction::UpdateMany(_) => "updateMany",
            NestedAction::DeleteMany(_) => "deleteMany",
            NestedAction::Upsert(_) => "upsert",
        }
    }
}

struct Parser<'a> {
    schema: &'a Schema,
}

impl Parser<'_> {
    fn data(&self, model: &Model, json: &Json, mode: Mode) -> Result<Data> {
        let map = expect_object(json, "`data`")?;
        let mut data = Data::default();

        for (key, value) in map {
            let field = model.field(key).ok_or_else(|| {
                Error::invalid_argument(format!("unknown field `{key}` in data for `{}`", model.name))
            })?;

            if field.is_relation() {
                let actions = self.relation(model, field, value, mode)?;
                data.relations.insert(field.name.clone(), actions);
            } else {
                let write = self.scalar(field, value, mode)?;
                data.scalars.insert(field.name.clone(), write);
            }
        }

        Ok(data)
    }

    fn scalar(&self, field: &Field, value: &Json, mode: Mode) -> Result<ScalarWrite> {
        let operators = match value {
            Json::Object(map) if field.ty.scalar() != Some(kiln_core::schema::ScalarType::Json) => map,
            _ => return self.set(field, value).map(ScalarWrite::Set),
        };

        let mut ops = operators.iter();
        let (Some((op, operand)), None) = (ops.next(), ops.next()) else {
            return Err(Error::invalid_argument(format!(
                "field `{}` takes exactly one update operator",
                field.name
            )));
        };

        let numeric = !field.array && field.ty.scalar().is_some_and(|s| s.is_numeric());
        let arithmetic = |operand: &Json| -> Result<Value> {
            if mode == Mode::Create || !numeric {
                return Err(Error::invalid_argument(format!(
                    "`{op}` is not allowed on field `{}`",
                    field.name
                )));
            }
            let value = coerce::element(self.schema, field, operand)?;
            if value.is_null() {
                return Err(Error::invalid_argument(format!("`{op}` needs a number")));
            }
            Ok(value)
        };

        Ok(match op.as_str() {
            "set" => ScalarWrite::Set(self.set(field, operand)?),
            "increment" => ScalarWrite::Increment(arithmetic(operand)?),
            "decrement" => ScalarWrite::Decrement(arithmetic(operand)?),
            "multiply" => ScalarWrite::Multiply(arithmetic(operand)?),
            "divide" => ScalarWrite::Divide(arithmetic(operand)?),
            "push" if field.array && mode == Mode::Update => {
                let values = match operand {
                    Json::Array(items) => items
                        .iter()
                        .map(|item| coerce::element(self.schema, field, item))
                        .collect::<Result<Vec<_>>>()?,
                    item => vec![coerce::element(self.schema, field, item)?],
                };
                ScalarWrite::Push(values)
            }
            _ => {
                return Err(Error::invalid_argument(format!(
                    "unsupported update operator `{op}` on field `{}`",
                    field.name
                )))
            }
        })
    }

    fn set(&self, field: &Field, value: &Json) -> Result<Value> {
        if value.is_null() && !field.optional {
            return Err(Error::invalid_argument(format!(
                "field `{}` is required and cannot be null",
                field.name
            )));
        }
        coerce::input(self.schema, field, value)
    }

    fn relation(&self, model: &Model, field: &Field, value: &Json, mode: Mode) -> Result<Vec<NestedAction>> {
        let target = self.schema.relation_target(field)?;
        let map = expect_object(value, &format!("relation data `{}.{}`", model.name, field.name))?;
        let to_many = field.is_to_many();
        let mut actions = vec![];

        for (op, operand) in map {
            let allowed = match op.as_str() {
                "create" | "connect" | "connectOrCreate" => true,
                "createMany" => to_many,
                "disconnect" | "delete" | "update" | "upsert" => mode == Mode::Update,
                "set" | "updateMany" | "deleteMany" => mode == Mode::Update && to_many,
                _ => false,
            };
            if !allowed {
                return Err(Error::invalid_argument(format!(
                    "`{op}` is not supported on relation `{}.{}` here",
                    model.name, field.name
                )));
            }

            let action = match op.as_str() {
                "create" => {
                    let items = self.items(field, operand)?;
                    NestedAction::Create(
                        items
                            .iter()
                            .map(|item| self.data(target, item, Mode::Create))
                            .collect::<Result<_>>()?,
                    )
                }
                "createMany" => {
                    let body = expect_object(operand, "`createMany`")?;
                    let data = body
                        .get("data")
                        .ok_or_else(|| Error::invalid_argument("`createMany` requires `data`"))?;
                    let skip_duplicates = body
                        .get("skipDuplicates")
                        .and_then(Json::as_bool)
                        .unwrap_or(false);
                    NestedAction::CreateMany {
                        data: one_or_many(data.clone())
                            .iter()
                            .map(|item| self.data(target, item, Mode::Create))
                            .collect::<Result<_>>()?,
                        skip_duplicates,
                    }
                }
                "connect" => NestedAction::Connect(self.unique_filters(field, target, operand)?),
                "connectOrCreate" => {
                    let mut pairs = vec![];
                    for item in self.items(field, operand)? {
                        let body = expect_object(&item, "`connectOrCreate`")?;
                        let (Some(filter), Some(create)) = (body.get("where"), body.get("create")) else {
                            return Err(Error::invalid_argument(
                                "`connectOrCreate` requires `where` and `create`",
                            ));
                        };
                        pairs.push((
                            Filter::parse_unique(self.schema, target, filter)?,
                            self.data(target, create, Mode::Create)?,
                        ));
                    }
                    NestedAction::ConnectOrCreate(pairs)
                }
                "set" => NestedAction::Set(self.unique_filters(field, target, operand)?),
                "disconnect" => NestedAction::Disconnect(self.targets(field, target, operand)?),
                "delete" => NestedAction::Delete(self.targets(field, target, operand)?),
                "update" => NestedAction::Update(self.updates(field, target, operand, true)?),
                "updateMany" => NestedAction::UpdateMany(self.updates(field, target, operand, false)?),
                "deleteMany" => NestedAction::DeleteMany(
                    one_or_many(operand.clone())
                        .iter()
                        .map(|item| Filter::parse(self.schema, target, item))
                        .collect::<Result<_>>()?,
                ),
                _ => {
                    let mut upserts = vec![];
                    for item in self.items(field, operand)? {
                        let body = expect_object(&item, "`upsert`")?;
                        let (Some(create), Some(update)) = (body.get("create"), body.get("update")) else {
                            return Err(Error::invalid_argument("`upsert` requires `create` and `update`"));
                        };
                        let filter = match body.get("where") {
                            Some(filter) if to_many => Filter::parse_unique(self.schema, target, filter)?,
                            Some(filter) => Filter::parse(self.schema, target, filter)?,
                            None if to_many => {
                                return Err(Error::invalid_argument("to-many `upsert` requires `where`"))
                            }
                            None => Filter::And(vec![]),
                        };
                        upserts.push(NestedUpsert {
                            filter,
                            create: self.data(target, create, Mode::Create)?,
                            update: self.data(target, update, Mode::Update)?,
                        });
                    }
                    NestedAction::Upsert(upserts)
                }
            };
            actions.push(action);
        }

        Ok(actions)
    }

    /// To-one relations take a single object, to-many a single object or a
    /// list.
    fn items(&self, field: &Field, operand: &Json) -> Result<Vec<Json>> {
        match operand {
            Json::Array(_) if !field.is_to_many() => Err(Error::invalid_argument(format!(
                "to-one relation `{}` does not accept a list",
                field.name
            ))),
            operand => Ok(one_or_many(operand.clone())),
        }
    }

    fn unique_filters(&self, field: &Field, target: &Model, operand: &Json) -> Result<Vec<Filter>> {
        self.items(field, operand)?
            .iter()
            .map(|item| Filter::parse_unique(self.schema, target, item))
            .collect()
    }

    /// `disconnect` / `delete`: `true`, a filter, or unique filters.
    fn targets(&self, field: &Field, target: &Model, operand: &Json) -> Result<Vec<Filter>> {
        if field.is_to_many() {
            return self.unique_filters(field, target, operand);
        }
        match operand {
            Json::Bool(true) => Ok(vec![Filter::And(vec![])]),
            Json::Bool(false) => Ok(vec![]),
            operand => Ok(vec![Filter::parse(self.schema, target, operand)?]),
        }
    }

    fn updates(&self, field: &Field, target: &Model, operand: &Json, unique: bool) -> Result<Vec<NestedUpdate>> {
        let mut out = vec![];
        for item in self.items(field, operand)? {
            let body = expect_object(&item, "nested update")?;
            let structured = body.contains_key("data") && body.keys().all(|k| k == "where" || k == "data");

            if !field.is_to_many() && !structured {
                out.push(NestedUpdate {
                    filter: Filter::And(vec![]),
                    data: self.data(target, &item, Mode::Update)?,
                });
                continue;
            }

            let data = body
                .get("data")
                .ok_or_else(|| Error::invalid_argument("nested update requires `data`"))?;
            let filter = match body.get("where") {
                Some(filter) if unique && field.is_to_many() => Filter::parse_unique(self.schema, target, filter)?,
                Some(filter) => Filter::parse(self.schema, target, filter)?,
                None if field.is_to_many() => {
                    return Err(Error::invalid_argument("to-many nested update requires `where`"))
                }
                None => Filter::And(vec![]),
            };
            let data = self.data(target, data, Mode::Update)?;
            if !unique && !data.relations.is_empty() {
                return Err(Error::invalid_argument("`updateMany` cannot write relations"));
            }
            out.push(NestedUpdate { filter, data });
        }
        Ok(out)
    }
}
