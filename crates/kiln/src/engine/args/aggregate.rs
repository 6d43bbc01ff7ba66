use super::{expect_object, filter::ScalarFilter, Args, Json};

use kiln_core::{
    schema::{Field, FieldType, Model, ScalarType},
    stmt::AggregateOp,
    Error, Result, Schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub(crate) const ALL: [AggregateFunc; 5] = [
        AggregateFunc::Count,
        AggregateFunc::Sum,
        AggregateFunc::Avg,
        AggregateFunc::Min,
        AggregateFunc::Max,
    ];

    pub(crate) fn from_key(key: &str) -> Option<AggregateFunc> {
        Self::ALL.into_iter().find(|func| func.key() == key)
    }

    pub(crate) fn key(self) -> &'static str {
        match self {
            AggregateFunc::Count => "_count",
            AggregateFunc::Sum => "_sum",
            AggregateFunc::Avg => "_avg",
            AggregateFunc::Min => "_min",
            AggregateFunc::Max => "_max",
        }
    }

    /// The SQL aggregate, `None` for counts.
    pub(crate) fn op(self) -> Option<AggregateOp> {
        match self {
            AggregateFunc::Count => None,
            AggregateFunc::Sum => Some(AggregateOp::Sum),
            AggregateFunc::Avg => Some(AggregateOp::Avg),
            AggregateFunc::Min => Some(AggregateOp::Min),
            AggregateFunc::Max => Some(AggregateOp::Max),
        }
    }

    /// Scalar type of the aggregate over `field`, `None` for counts over all
    /// rows.
    pub(crate) fn result_type(self, field: Option<&Field>) -> ScalarType {
        let source = field.and_then(|field| field.ty.scalar());
        match (self, source) {
            (AggregateFunc::Count, _) => ScalarType::BigInt,
            (AggregateFunc::Avg, Some(ScalarType::Decimal)) => ScalarType::Decimal,
            (AggregateFunc::Avg, _) => ScalarType::Float,
            (AggregateFunc::Sum, Some(ScalarType::Int)) => ScalarType::BigInt,
            (_, Some(scalar)) => scalar,
            // Enums aggregate as text under min/max.
            (_, None) => ScalarType::String,
        }
    }

    fn accepts(self, field: &Field) -> bool {
        let numeric = field.ty.scalar().is_some_and(ScalarType::is_numeric);
        match self {
            AggregateFunc::Count => true,
            AggregateFunc::Sum | AggregateFunc::Avg => numeric && !field.array,
            AggregateFunc::Min | AggregateFunc::Max => !field.array && field.ty.scalar() != Some(ScalarType::Json),
        }
    }
}

/// One requested aggregate, e.g. `_sum.amount`. `field` is `None` for
/// `_count._all`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AggregateItem {
    pub(crate) func: AggregateFunc,
    pub(crate) field: Option<String>,
}

impl AggregateItem {
    /// Flat column alias, split back into nested objects on output.
    pub(crate) fn alias(&self) -> String {
        format!("{}.{}", self.func.key(), self.field.as_deref().unwrap_or("_all"))
    }

    /// Takes `_count`, `_sum`, `_avg`, `_min` and `_max` out of `args`.
    pub(crate) fn take_all(model: &Model, args: &mut Args) -> Result<Vec<AggregateItem>> {
        let mut items = vec![];
        for func in AggregateFunc::ALL {
            let Some(value) = args.take(func.key()) else {
                continue;
            };
            items.extend(AggregateItem::parse(model, func, &value)?);
        }
        Ok(items)
    }

    pub(crate) fn parse(model: &Model, func: AggregateFunc, value: &Json) -> Result<Vec<AggregateItem>> {
        if func == AggregateFunc::Count && value.as_bool() == Some(true) {
            return Ok(vec![AggregateItem { func, field: None }]);
        }

        let map = expect_object(value, func.key())?;
        let mut items = vec![];
        for (key, enabled) in map {
            match enabled {
                Json::Bool(true) => {}
                Json::Bool(false) => continue,
                other => {
                    return Err(Error::invalid_argument(format!(
                        "`{}.{key}` must be a boolean, got `{other}`",
                        func.key()
                    )))
                }
            }

            if key == "_all" && func == AggregateFunc::Count {
                items.push(AggregateItem { func, field: None });
                continue;
            }

            let field = model.require_field(key)?;
            if field.is_relation() || !func.accepts(field) {
                return Err(Error::invalid_argument(format!(
                    "`{}` cannot be applied to field `{}.{key}`",
                    func.key(),
                    model.name
                )));
            }
            items.push(AggregateItem {
                func,
                field: Some(field.name.clone()),
            });
        }
        Ok(items)
    }
}

/// A `having` tree of `groupBy`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Having {
    And(Vec<Having>),
    Or(Vec<Having>),
    Not(Box<Having>),

    /// A condition on a grouped field or, with `func`, on an aggregate of it.
    Field {
        field: String,
        func: Option<AggregateFunc>,
        filter: ScalarFilter,
    },
}

impl Having {
    pub(crate) fn parse(schema: &Schema, model: &Model, json: &Json) -> Result<Having> {
        let map = expect_object(json, "`having`")?;
        let mut items = vec![];

        for (key, value) in map {
            let item = match key.as_str() {
                "AND" | "OR" | "NOT" => {
                    let list = match value {
                        Json::Array(list) => list
                            .iter()
                            .map(|item| Having::parse(schema, model, item))
                            .collect::<Result<Vec<_>>>()?,
                        item => vec![Having::parse(schema, model, item)?],
                    };
                    match key.as_str() {
                        "AND" => Having::And(list),
                        "OR" => Having::Or(list),
                        _ => Having::And(list.into_iter().map(|h| Having::Not(Box::new(h))).collect()),
                    }
                }
                name => {
                    let field = model.require_field(name)?;
                    Having::field(schema, field, value)?
                }
            };
            items.push(item);
        }

        Ok(match items.len() {
            1 => items.remove(0),
            _ => Having::And(items),
        })
    }

    /// `{ amount: { _sum: { gt: 5 }, gte: 1 } }`: aggregate keys select the
    /// aggregate, the remaining keys filter the grouped value itself.
    fn field(schema: &Schema, field: &Field, value: &Json) -> Result<Having> {
        let Json::Object(map) = value else {
            return Ok(Having::Field {
                field: field.name.clone(),
                func: None,
                filter: ScalarFilter::parse(schema, field, value)?,
            });
        };

        let mut items = vec![];
        let mut plain = serde_json::Map::new();
        for (key, operand) in map {
            match AggregateFunc::from_key(key) {
                Some(func) => {
                    let ty = func.result_type(Some(field));
                    let typed = Field {
                        name: format!("{}.{}", func.key(), field.name),
                        ty: FieldType::Scalar(ty),
                        array: false,
                        ..field.clone()
                    };
                    items.push(Having::Field {
                        field: field.name.clone(),
                        func: Some(func),
                        filter: ScalarFilter::parse(schema, &typed, operand)?,
                    });
                }
                None => {
                    plain.insert(key.clone(), operand.clone());
                }
            }
        }

        if !plain.is_empty() {
            items.push(Having::Field {
                field: field.name.clone(),
                func: None,
                filter: ScalarFilter::parse(schema, field, &Json::Object(plain))?,
            });
        }

        Ok(match items.len() {
            1 => items.remove(0),
            _ => Having::And(items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::args::ScalarCond;
    use crate::engine::test_util::blog;
    use kiln_core::stmt::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn aggregate_items_and_aliases() {
        let schema = blog();
        let user = schema.model("User").unwrap();
        let mut args = Args::new(json!({ "_count": { "_all": true, "email": true }, "_sum": { "score": true } }))
            .unwrap();
        let items = AggregateItem::take_all(user, &mut args).unwrap();
        let aliases: Vec<_> = items.iter().map(AggregateItem::alias).collect();
        assert_eq!(aliases, vec!["_count._all", "_count.email", "_sum.score"]);
        args.finish("aggregate").unwrap();
    }

    #[test]
    fn sum_of_text_is_rejected() {
        let schema = blog();
        let user = schema.model("User").unwrap();
        let err = AggregateItem::parse(user, AggregateFunc::Sum, &json!({ "email": true })).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn result_types() {
        let schema = blog();
        let user = schema.model("User").unwrap();
        let balance = user.field("balance");
        let score = user.field("score");
        assert_eq!(AggregateFunc::Avg.result_type(balance), ScalarType::Decimal);
        assert_eq!(AggregateFunc::Avg.result_type(score), ScalarType::Float);
        assert_eq!(AggregateFunc::Sum.result_type(score), ScalarType::BigInt);
        assert_eq!(AggregateFunc::Max.result_type(score), ScalarType::Int);
        assert_eq!(AggregateFunc::Count.result_type(None), ScalarType::BigInt);
    }

    #[test]
    fn having_on_aggregates() {
        let schema = blog();
        let user = schema.model("User").unwrap();
        let having = Having::parse(&schema, user, &json!({ "score": { "_sum": { "gt": 10 } } })).unwrap();
        assert_eq!(
            having,
            Having::Field {
                field: "score".into(),
                func: Some(AggregateFunc::Sum),
                filter: ScalarFilter {
                    conds: vec![ScalarCond::Gt(Value::I64(10))],
                    insensitive: false,
                },
            }
        );
    }
}
