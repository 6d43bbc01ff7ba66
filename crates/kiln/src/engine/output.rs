//! Shapes driver rows into the JSON returned to callers.
//!
//! Top-level columns arrive typed from the driver. Relations arrive as JSON
//! built by the database, where every backend has its own idea of how
//! booleans, decimals, timestamps and bytes look, so nested values are
//! coerced back to their field's declared type here.

use super::{
    args::{Json, JsonMap, ReadArgs, Selected, Selection},
    coerce,
    lower::{Column, InMemory},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::SecondsFormat;
use kiln_core::{
    schema::{Field, FieldType, Model, ScalarType},
    stmt::{Value, ValueObject, ValueRecord},
    Error, Result, Schema,
};

/// Pairs each row's values with the keys of the columns that produced them.
pub(crate) fn objects(columns: &[Column], rows: Vec<ValueRecord>) -> Vec<ValueObject> {
    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| column.key.clone())
                .zip(row.into_vec())
                .collect()
        })
        .collect()
}

/// Applies de-duplication and pagination the database could not.
pub(crate) fn apply_in_memory<T>(
    rows: Vec<T>,
    in_memory: &InMemory,
    distinct_key: impl Fn(&T, &str) -> Json,
) -> Vec<T> {
    let mut rows = if in_memory.distinct.is_empty() {
        rows
    } else {
        let mut seen: Vec<Vec<Json>> = vec![];
        rows.into_iter()
            .filter(|row| {
                let key: Vec<Json> = in_memory
                    .distinct
                    .iter()
                    .map(|field| distinct_key(row, field))
                    .collect();
                if seen.contains(&key) {
                    false
                } else {
                    seen.push(key);
                    true
                }
            })
            .collect()
    };

    if let Some(skip) = in_memory.skip {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX).min(rows.len());
        rows.drain(..skip);
    }
    if let Some(take) = in_memory.take {
        rows.truncate(usize::try_from(take).unwrap_or(usize::MAX));
    }
    if in_memory.reverse {
        rows.reverse();
    }
    rows
}

/// Nests flat `_sum.amount` style keys into `{ "_sum": { "amount": .. } }`.
pub(crate) fn nest_aliases(row: ValueObject) -> Json {
    let mut out = JsonMap::new();
    for (key, value) in row {
        match key.split_once('.') {
            Some((group, name)) => {
                let entry = out
                    .entry(group.to_string())
                    .or_insert_with(|| Json::Object(JsonMap::new()));
                if let Json::Object(map) = entry {
                    map.insert(name.to_string(), value.to_json());
                }
            }
            None => {
                out.insert(key, value.to_json());
            }
        }
    }
    Json::Object(out)
}

pub(crate) struct Shape<'a> {
    schema: &'a Schema,
}

impl<'a> Shape<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Shape<'a> {
        Shape { schema }
    }

    /// Shapes one top-level row of `model` per `selection`.
    pub(crate) fn row(&self, model: &Model, selection: &Selection, mut row: ValueObject) -> Result<Json> {
        let mut out = JsonMap::new();
        let concrete = selection
            .polymorphic
            .then(|| self.concrete(model, |name| row.get(name).and_then(Value::as_str).map(str::to_string)))
            .flatten();

        for item in &selection.items {
            match item {
                Selected::Scalar(name) => {
                    let value = row.remove(name).unwrap_or_default();
                    out.insert(name.clone(), value.to_json());
                }
                Selected::Relation { field, args } => {
                    let field = model.require_field(field)?;
                    let json = match row.remove(&field.name).unwrap_or_default() {
                        Value::Json(json) => json,
                        Value::String(text) => serde_json::from_str(&text)?,
                        Value::Null => Json::Null,
                        other => return Err(Error::type_conversion(other, "JSON")),
                    };
                    out.insert(field.name.clone(), self.relation(field, args, json)?);
                }
                Selected::Count(items) => {
                    let mut counts = JsonMap::new();
                    for item in items {
                        let key = super::lower::count_key(&item.field);
                        let value = row.remove(&key).unwrap_or(Value::I64(0));
                        counts.insert(item.field.clone(), value.to_json());
                    }
                    out.insert("_count".to_string(), Json::Object(counts));
                }
            }
        }

        for (key, field) in self.sub_model_fields(model, concrete.as_deref()) {
            let value = row.remove(&key).unwrap_or_default();
            out.insert(field.name.clone(), value.to_json());
        }

        Ok(Json::Object(out))
    }

    /// Shapes the JSON a relation subquery produced.
    fn relation(&self, field: &Field, args: &ReadArgs, json: Json) -> Result<Json> {
        let target = self.schema.relation_target(field)?;
        let json = match json {
            // Some backends hand nested JSON back as text.
            Json::String(text) => serde_json::from_str(&text)?,
            json => json,
        };

        if !field.is_to_many() {
            return match json {
                Json::Object(map) => self.object(target, &args.selection, map),
                _ => Ok(Json::Null),
            };
        }

        let rows: Vec<JsonMap> = match json {
            Json::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Json::Object(map) => Some(map),
                    Json::String(text) => serde_json::from_str(&text).ok(),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        };

        let in_memory = InMemory {
            reverse: args.take.is_some_and(|take| take < 0),
            distinct: args.distinct.clone(),
            skip: args.skip.filter(|_| !args.distinct.is_empty()),
            take: args
                .take
                .map(i64::unsigned_abs)
                .filter(|_| !args.distinct.is_empty()),
        };
        let rows = apply_in_memory(rows, &in_memory, |row, name| {
            row.get(name).cloned().unwrap_or(Json::Null)
        });

        let mut out = vec![];
        for row in rows {
            out.push(self.object(target, &args.selection, row)?);
        }
        Ok(Json::Array(out))
    }

    fn object(&self, model: &Model, selection: &Selection, mut map: JsonMap) -> Result<Json> {
        let mut out = JsonMap::new();
        let concrete = selection
            .polymorphic
            .then(|| self.concrete(model, |name| map.get(name).and_then(Json::as_str).map(str::to_string)))
            .flatten();

        for item in &selection.items {
            match item {
                Selected::Scalar(name) => {
                    let field = model.require_field(name)?;
                    let value = map.remove(name).unwrap_or(Json::Null);
                    out.insert(name.clone(), field_value(field, value)?);
                }
                Selected::Relation { field, args } => {
                    let field = model.require_field(field)?;
                    let value = map.remove(&field.name).unwrap_or(Json::Null);
                    out.insert(field.name.clone(), self.relation(field, args, value)?);
                }
                Selected::Count(items) => {
                    let counts = match map.remove("_count") {
                        Some(Json::Object(counts)) => counts,
                        Some(Json::String(text)) => serde_json::from_str(&text)?,
                        _ => JsonMap::new(),
                    };
                    let mut shaped = JsonMap::new();
                    for item in items {
                        let count = counts.get(&item.field).map(integer).unwrap_or(Json::from(0));
                        shaped.insert(item.field.clone(), count);
                    }
                    out.insert("_count".to_string(), Json::Object(shaped));
                }
            }
        }

        for (key, field) in self.sub_model_fields(model, concrete.as_deref()) {
            let value = map.remove(&key).unwrap_or(Json::Null);
            out.insert(field.name.clone(), field_value(field, value)?);
        }

        Ok(Json::Object(out))
    }

    /// The concrete sub-model a polymorphic row belongs to, read from the
    /// discriminator.
    fn concrete(&self, model: &Model, read: impl Fn(&str) -> Option<String>) -> Option<String> {
        let discriminator = self.schema.discriminator(model)?;
        read(&discriminator.name)
    }

    /// Sub-model fields to report for a row of concrete type `concrete`,
    /// with the keys they were fetched under.
    fn sub_model_fields(&self, model: &Model, concrete: Option<&str>) -> Vec<(String, &'a Field)> {
        let Some(concrete) = concrete.and_then(|name| self.schema.model(name)) else {
            return vec![];
        };
        let mut out = vec![];
        for sub in self.schema.descendants(model) {
            if !self.schema.is_same_or_descendant(concrete, sub) {
                continue;
            }
            for field in sub.scalar_fields().filter(|f| !f.is_inherited() && !f.id) {
                out.push((super::lower::sub_model_key(&sub.name, &field.name), field));
            }
        }
        out
    }
}

/// Coerces a value read out of database-built JSON to `field`'s type.
pub(crate) fn field_value(field: &Field, json: Json) -> Result<Json> {
    if json.is_null() {
        return Ok(Json::Null);
    }

    let scalar = match &field.ty {
        FieldType::Scalar(scalar) => *scalar,
        FieldType::Enum(_) => ScalarType::String,
        FieldType::Model(_) => return Ok(json),
    };

    if field.array {
        let items = match json {
            Json::String(text) => match serde_json::from_str(&text)? {
                Json::Array(items) => items,
                other => vec![other],
            },
            Json::Array(items) => items,
            other => vec![other],
        };
        return items
            .into_iter()
            .map(|item| scalar_value(field, scalar, item))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array);
    }

    scalar_value(field, scalar, json)
}

fn scalar_value(field: &Field, scalar: ScalarType, json: Json) -> Result<Json> {
    let mismatch = |json: &Json| Error::type_conversion(json, scalar.name());

    Ok(match (scalar, json) {
        (_, Json::Null) => Json::Null,
        (ScalarType::Boolean, Json::Number(n)) => Json::Bool(n.as_f64().is_some_and(|n| n != 0.0)),
        (ScalarType::Boolean, Json::String(text)) => match text.as_str() {
            "1" | "t" | "true" => Json::Bool(true),
            "0" | "f" | "false" => Json::Bool(false),
            _ => return Err(mismatch(&Json::String(text))),
        },
        (ScalarType::Int | ScalarType::BigInt, json) => integer(&json),
        (ScalarType::Float, Json::String(text)) => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Json::Number)
            .ok_or_else(|| mismatch(&Json::String(text)))?,
        (ScalarType::Decimal, json) => {
            let decimal = coerce::decimal(&json).ok_or_else(|| mismatch(&json))?;
            Json::String(decimal.normalize().to_string())
        }
        (ScalarType::DateTime, Json::String(text)) => {
            let datetime = coerce::datetime(&text).ok_or_else(|| mismatch(&Json::String(text.clone())))?;
            Json::String(datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        (ScalarType::Bytes, Json::String(text)) => {
            let bytes = coerce::hex_decode(&text).ok_or_else(|| mismatch(&Json::String(text.clone())))?;
            Json::String(STANDARD.encode(bytes))
        }
        (ScalarType::Json, Json::String(text)) if field.array => {
            serde_json::from_str(&text).unwrap_or(Json::String(text))
        }
        (_, json) => json,
    })
}

/// Integers may come back as numbers, floats or numeric strings.
fn integer(json: &Json) -> Json {
    match json {
        Json::Number(n) if n.is_i64() || n.is_u64() => json.clone(),
        Json::Number(n) => n.as_f64().map(|f| Json::from(f as i64)).unwrap_or(Json::Null),
        Json::String(text) => text
            .parse::<i64>()
            .map(Json::from)
            .unwrap_or_else(|_| Json::String(text.clone())),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        args::{Args, ReadArgs},
        lower::Column,
        test_util,
    };

    use kiln_core::stmt::Type;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn read_args(schema: &Schema, model: &Model, args: Json) -> ReadArgs {
        let mut args = Args::new(args).unwrap();
        ReadArgs::take(schema, model, &mut args).unwrap()
    }

    #[test]
    fn rows_are_keyed_by_column() {
        let columns = vec![
            Column { key: "id".into(), ty: Type::I64 },
            Column { key: "email".into(), ty: Type::String },
        ];
        let rows = vec![ValueRecord::from_vec(vec![Value::I64(1), Value::from("a@x.io")])];
        let objects = objects(&columns, rows);
        assert_eq!(objects[0].get_or_null("email"), &Value::from("a@x.io"));
    }

    #[test]
    fn nested_values_are_coerced_to_field_types() {
        let schema = test_util::blog();
        let user = schema.require_model("User").unwrap();
        let args = read_args(
            &schema,
            user,
            json!({ "select": { "balance": true, "posts": { "select": { "published": true, "createdAt": true, "tags": true } } } }),
        );

        let mut row = ValueObject::new();
        row.insert("balance", Value::Decimal("12.500".parse().unwrap()));
        row.insert(
            "posts",
            Value::Json(json!([
                { "published": 1, "createdAt": "2024-05-01 10:00:00", "tags": "[\"a\",\"b\"]" },
                { "published": 0, "createdAt": "2024-05-01T10:00:00.123+02:00", "tags": null }
            ])),
        );

        let shaped = Shape::new(&schema).row(user, &args.selection, row).unwrap();
        assert_eq!(
            shaped,
            json!({
                "balance": "12.5",
                "posts": [
                    { "published": true, "createdAt": "2024-05-01T10:00:00.000Z", "tags": ["a", "b"] },
                    { "published": false, "createdAt": "2024-05-01T08:00:00.123Z", "tags": null }
                ]
            })
        );
    }

    #[test]
    fn missing_to_one_is_null() {
        let schema = test_util::blog();
        let user = schema.require_model("User").unwrap();
        let args = read_args(&schema, user, json!({ "select": { "id": true, "profile": true } }));

        let mut row = ValueObject::new();
        row.insert("id", Value::I32(1));
        row.insert("profile", Value::Null);
        let shaped = Shape::new(&schema).row(user, &args.selection, row).unwrap();
        assert_eq!(shaped, json!({ "id": 1, "profile": null }));
    }

    #[test]
    fn counts_nest_under_count_key() {
        let schema = test_util::blog();
        let user = schema.require_model("User").unwrap();
        let args = read_args(&schema, user, json!({ "select": { "_count": { "select": { "posts": true } } } }));

        let mut row = ValueObject::new();
        row.insert("_count.posts", Value::I64(3));
        let shaped = Shape::new(&schema).row(user, &args.selection, row).unwrap();
        assert_eq!(shaped, json!({ "_count": { "posts": 3 } }));
    }

    #[test]
    fn polymorphic_rows_report_their_concrete_fields() {
        let schema = test_util::blog();
        let asset = schema.require_model("Asset").unwrap();
        let args = read_args(&schema, asset, json!({}));

        let mut row = ValueObject::new();
        row.insert("id", Value::I32(4));
        row.insert("kind", Value::from("Video"));
        row.insert("views", Value::I32(0));
        row.insert("Video$duration", Value::I32(90));
        row.insert("Image$width", Value::Null);

        let shaped = Shape::new(&schema).row(asset, &args.selection, row).unwrap();
        assert_eq!(shaped, json!({ "id": 4, "kind": "Video", "views": 0, "duration": 90 }));
    }

    #[test]
    fn aggregate_aliases_nest() {
        let mut row = ValueObject::new();
        row.insert("_count._all", Value::I64(2));
        row.insert("_sum.score", Value::I64(7));
        row.insert("_avg.score", Value::F64(3.5));
        row.insert("email", Value::from("a@x.io"));
        assert_eq!(
            nest_aliases(row),
            json!({ "_count": { "_all": 2 }, "_sum": { "score": 7 }, "_avg": { "score": 3.5 }, "email": "a@x.io" })
        );
    }

    #[test]
    fn in_memory_distinct_then_paginate() {
        let rows = vec![json!({"t": "a"}), json!({"t": "a"}), json!({"t": "b"}), json!({"t": "c"})];
        let in_memory = InMemory {
            reverse: false,
            distinct: vec!["t".into()],
            skip: Some(1),
            take: Some(1),
        };
        let out = apply_in_memory(rows, &in_memory, |row, name| row[name].clone());
        assert_eq!(out, vec![json!({"t": "b"})]);
    }
}
