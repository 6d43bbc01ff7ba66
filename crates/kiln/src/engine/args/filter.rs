use super::{expect_object, Json, JsonMap};
use crate::engine::coerce;

use kiln_core::{
    schema::{Field, Model},
    stmt::Value,
    Error, Result, Schema,
};

/// A `where` tree, resolved against one model.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Scalar { field: String, filter: ScalarFilter },
    Relation { field: String, filter: RelationFilter },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ScalarFilter {
    pub(crate) conds: Vec<ScalarCond>,

    /// `mode: "insensitive"`
    pub(crate) insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScalarCond {
    Equals(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Not(ScalarFilter),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Has(Value),
    HasEvery(Vec<Value>),
    HasSome(Vec<Value>),
    IsEmpty(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RelationFilter {
    /// `is` on a to-one relation; `None` matches a missing related row.
    Is(Option<Box<Filter>>),
    IsNot(Option<Box<Filter>>),
    Some(Box<Filter>),
    Every(Box<Filter>),
    None(Box<Filter>),
}

impl Filter {
    pub(crate) fn and(filters: Vec<Filter>) -> Filter {
        match filters.len() {
            1 => filters.into_iter().next().unwrap_or(Filter::And(vec![])),
            _ => Filter::And(filters),
        }
    }

    /// `field = value`
    pub(crate) fn equals(field: impl Into<String>, value: Value) -> Filter {
        Filter::Scalar {
            field: field.into(),
            filter: ScalarFilter {
                conds: vec![ScalarCond::Equals(value)],
                insensitive: false,
            },
        }
    }

    /// `field IN values`
    pub(crate) fn in_list(field: impl Into<String>, values: Vec<Value>) -> Filter {
        Filter::Scalar {
            field: field.into(),
            filter: ScalarFilter {
                conds: vec![ScalarCond::In(values)],
                insensitive: false,
            },
        }
    }

    /// Matches every row.
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Filter::And(filters) if filters.iter().all(Filter::is_empty))
    }

    /// Parses a `where` object against `model`.
    pub(crate) fn parse(schema: &Schema, model: &Model, json: &Json) -> Result<Filter> {
        let map = expect_object(json, "`where`")?;
        Parser { schema }.object(model, map)
    }

    /// Parses a unique `where`, requiring it to cover a unique field set.
    pub(crate) fn parse_unique(schema: &Schema, model: &Model, json: &Json) -> Result<Filter> {
        let map = expect_object(json, "unique `where`")?;

        let covers = model.covers_unique_set(|name| {
            map.get(name).is_some_and(|value| !value.is_object() || is_equals_object(value))
        }) || model
            .unique_fields
            .iter()
            .any(|(name, set)| set.is_compound() && map.contains_key(name));

        if !covers {
            return Err(Error::invalid_argument(format!(
                "`where` on `{}` must specify a unique field set",
                model.name
            )));
        }

        Parser { schema }.object(model, map)
    }
}

impl ScalarFilter {
    /// Parses the condition on one scalar field: a bare value or an operator
    /// object.
    pub(crate) fn parse(schema: &Schema, field: &Field, json: &Json) -> Result<ScalarFilter> {
        Parser { schema }.scalar(field, json)
    }
}

fn is_equals_object(value: &Json) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.contains_key("equals"))
}

struct Parser<'a> {
    schema: &'a Schema,
}

impl Parser<'_> {
    fn object(&self, model: &Model, map: &JsonMap) -> Result<Filter> {
        let mut filters = vec![];

        for (key, value) in map {
            let filter = match key.as_str() {
                "AND" => Filter::And(self.list(model, value)?),
                "OR" => match value {
                    Json::Array(_) => Filter::Or(self.list(model, value)?),
                    _ => self.object(model, expect_object(value, "`OR`")?)?,
                },
                "NOT" => {
                    let negated = self
                        .list(model, value)?
                        .into_iter()
                        .map(|filter| Filter::Not(Box::new(filter)))
                        .collect();
                    Filter::and(negated)
                }
                name => match model.field(name) {
                    Some(field) if field.is_relation() => self.relation(model, field, value)?,
                    Some(field) => Filter::Scalar {
                        field: field.name.clone(),
                        filter: self.scalar(field, value)?,
                    },
                    None => self.compound_unique(model, name, value)?,
                },
            };
            filters.push(filter);
        }

        Ok(Filter::and(filters))
    }

    fn list(&self, model: &Model, value: &Json) -> Result<Vec<Filter>> {
        match value {
            Json::Array(items) => items
                .iter()
                .map(|item| self.object(model, expect_object(item, "filter")?))
                .collect(),
            item => Ok(vec![self.object(model, expect_object(item, "filter")?)?]),
        }
    }

    fn compound_unique(&self, model: &Model, name: &str, value: &Json) -> Result<Filter> {
        let Some(set) = model.unique_fields.get(name).filter(|set| set.is_compound()) else {
            return Err(Error::invalid_argument(format!(
                "unknown field `{name}` in filter on `{}`",
                model.name
            )));
        };

        let map = expect_object(value, &format!("compound unique `{name}`"))?;
        let mut filters = vec![];
        for field_name in set.fields() {
            let field = model.require_field(field_name)?;
            let json = map.get(field_name).ok_or_else(|| {
                Error::invalid_argument(format!("compound unique `{name}` is missing `{field_name}`"))
            })?;
            filters.push(Filter::equals(field_name, coerce::input(self.schema, field, json)?));
        }
        Ok(Filter::And(filters))
    }

    fn scalar(&self, field: &Field, value: &Json) -> Result<ScalarFilter> {
        let Json::Object(ops) = value else {
            return Ok(ScalarFilter {
                conds: vec![ScalarCond::Equals(coerce::input(self.schema, field, value)?)],
                insensitive: false,
            });
        };

        let mut filter = ScalarFilter::default();
        for (op, operand) in ops {
            let cond = match op.as_str() {
                "equals" => ScalarCond::Equals(coerce::input(self.schema, field, operand)?),
                "in" => ScalarCond::In(self.elements(field, operand)?),
                "notIn" => ScalarCond::NotIn(self.elements(field, operand)?),
                "lt" => ScalarCond::Lt(self.comparable(field, operand)?),
                "lte" => ScalarCond::Lte(self.comparable(field, operand)?),
                "gt" => ScalarCond::Gt(self.comparable(field, operand)?),
                "gte" => ScalarCond::Gte(self.comparable(field, operand)?),
                "not" => ScalarCond::Not(self.scalar(field, operand)?),
                "contains" => ScalarCond::Contains(pattern(field, op, operand)?),
                "startsWith" => ScalarCond::StartsWith(pattern(field, op, operand)?),
                "endsWith" => ScalarCond::EndsWith(pattern(field, op, operand)?),
                "mode" => {
                    filter.insensitive = match operand.as_str() {
                        Some("insensitive") => true,
                        Some("default") => false,
                        _ => {
                            return Err(Error::invalid_argument(format!(
                                "`mode` must be \"default\" or \"insensitive\", got `{operand}`"
                            )))
                        }
                    };
                    continue;
                }
                "has" if field.array => ScalarCond::Has(coerce::element(self.schema, field, operand)?),
                "hasEvery" if field.array => ScalarCond::HasEvery(self.elements(field, operand)?),
                "hasSome" if field.array => ScalarCond::HasSome(self.elements(field, operand)?),
                "isEmpty" if field.array => ScalarCond::IsEmpty(operand.as_bool().ok_or_else(|| {
                    Error::invalid_argument(format!("`isEmpty` must be a boolean, got `{operand}`"))
                })?),
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "unsupported filter `{op}` on field `{}`",
                        field.name
                    )))
                }
            };
            filter.conds.push(cond);
        }
        Ok(filter)
    }

    fn elements(&self, field: &Field, value: &Json) -> Result<Vec<Value>> {
        let Json::Array(items) = value else {
            return Err(Error::invalid_argument(format!(
                "expected a list for field `{}`, got `{value}`",
                field.name
            )));
        };
        items
            .iter()
            .map(|item| coerce::element(self.schema, field, item))
            .collect()
    }

    fn comparable(&self, field: &Field, value: &Json) -> Result<Value> {
        if field.array {
            return Err(Error::invalid_argument(format!(
                "list field `{}` cannot be compared with lt/lte/gt/gte",
                field.name
            )));
        }
        coerce::element(self.schema, field, value)
    }

    fn relation(&self, model: &Model, field: &Field, value: &Json) -> Result<Filter> {
        let target = self.schema.relation_target(field)?;
        let nested = |value: &Json| -> Result<Box<Filter>> {
            Ok(Box::new(self.object(target, expect_object(value, "relation filter")?)?))
        };
        let optional_nested = |value: &Json| -> Result<Option<Box<Filter>>> {
            match value {
                Json::Null => Ok(None),
                value => nested(value).map(Some),
            }
        };

        let mut filters = vec![];

        if field.is_to_many() {
            let map = expect_object(value, &format!("filter on `{}.{}`", model.name, field.name))?;
            for (op, operand) in map {
                let filter = match op.as_str() {
                    "some" => RelationFilter::Some(nested(operand)?),
                    "every" => RelationFilter::Every(nested(operand)?),
                    "none" => RelationFilter::None(nested(operand)?),
                    _ => {
                        return Err(Error::invalid_argument(format!(
                            "unsupported filter `{op}` on to-many relation `{}`",
                            field.name
                        )))
                    }
                };
                filters.push(Filter::Relation {
                    field: field.name.clone(),
                    filter,
                });
            }
            return Ok(Filter::and(filters));
        }

        let map = match value {
            Json::Null => {
                return Ok(Filter::Relation {
                    field: field.name.clone(),
                    filter: RelationFilter::Is(None),
                })
            }
            value => expect_object(value, &format!("filter on `{}.{}`", model.name, field.name))?,
        };

        let explicit = map.keys().all(|key| key == "is" || key == "isNot") && !map.is_empty();
        if !explicit {
            return Ok(Filter::Relation {
                field: field.name.clone(),
                filter: RelationFilter::Is(Some(nested(value)?)),
            });
        }

        for (op, operand) in map {
            let filter = match op.as_str() {
                "is" => RelationFilter::Is(optional_nested(operand)?),
                _ => RelationFilter::IsNot(optional_nested(operand)?),
            };
            filters.push(Filter::Relation {
                field: field.name.clone(),
                filter,
            });
        }
        Ok(Filter::and(filters))
    }
}

fn pattern(field: &Field, op: &str, value: &Json) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        Error::invalid_argument(format!(
            "`{op}` on field `{}` expects a string, got `{value}`",
            field.name
        ))
    })
}
