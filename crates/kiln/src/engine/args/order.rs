use super::{one_or_many, AggregateFunc, Args, Json};

use kiln_core::{
    schema::Model,
    stmt::{Direction, NullsOrder},
    Error, Result, Schema,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OrderBy {
    /// A scalar of the model, or of a to-one relation reached through `path`.
    Field {
        path: Vec<String>,
        field: String,
        direction: Direction,
        nulls: Option<NullsOrder>,
    },

    /// Number of rows in a to-many relation.
    RelationCount {
        path: Vec<String>,
        field: String,
        direction: Direction,
    },

    /// An aggregate of the group, `groupBy` only. `field` is `None` for
    /// `_count: { _all }`.
    Aggregate {
        func: AggregateFunc,
        field: Option<String>,
        direction: Direction,
    },
}

impl OrderBy {
    /// Takes and parses `orderBy`.
    pub(crate) fn take(schema: &Schema, model: &Model, args: &mut Args) -> Result<Vec<OrderBy>> {
        match args.take("orderBy") {
            None | Some(Json::Null) => Ok(vec![]),
            Some(json) => OrderBy::parse(schema, model, json, false),
        }
    }

    pub(crate) fn parse(schema: &Schema, model: &Model, json: Json, aggregates: bool) -> Result<Vec<OrderBy>> {
        let mut out = vec![];
        for item in one_or_many(json) {
            let Json::Object(map) = item else {
                return Err(Error::invalid_argument(format!(
                    "`orderBy` entries must be objects, got `{item}`"
                )));
            };
            for (key, value) in map {
                match AggregateFunc::from_key(&key) {
                    Some(func) if aggregates => aggregate(model, func, &value, &mut out)?,
                    _ => field(schema, model, vec![], &key, &value, &mut out)?,
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn direction(&self) -> Direction {
        match self {
            OrderBy::Field { direction, .. }
            | OrderBy::RelationCount { direction, .. }
            | OrderBy::Aggregate { direction, .. } => *direction,
        }
    }

    /// The same ordering, reversed, for negative `take`.
    pub(crate) fn reversed(&self) -> OrderBy {
        let flip = |direction: Direction| match direction {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        };
        let mut order = self.clone();
        match &mut order {
            OrderBy::Field { direction, nulls, .. } => {
                *direction = flip(*direction);
                *nulls = nulls.map(|nulls| match nulls {
                    NullsOrder::First => NullsOrder::Last,
                    NullsOrder::Last => NullsOrder::First,
                });
            }
            OrderBy::RelationCount { direction, .. } | OrderBy::Aggregate { direction, .. } => {
                *direction = flip(*direction)
            }
        }
        order
    }
}

fn field(
    schema: &Schema,
    model: &Model,
    mut path: Vec<String>,
    key: &str,
    value: &Json,
    out: &mut Vec<OrderBy>,
) -> Result<()> {
    let field = model.require_field(key)?;

    if !field.is_relation() {
        let (direction, nulls) = sort(value)?;
        out.push(OrderBy::Field {
            path,
            field: field.name.clone(),
            direction,
            nulls,
        });
        return Ok(());
    }

    let Json::Object(map) = value else {
        return Err(Error::invalid_argument(format!(
            "ordering by relation `{}` needs a nested object, got `{value}`",
            field.name
        )));
    };

    if field.is_to_many() {
        for (key, value) in map {
            if key != "_count" {
                return Err(Error::invalid_argument(format!(
                    "to-many relation `{}` can only be ordered by `_count`",
                    field.name
                )));
            }
            out.push(OrderBy::RelationCount {
                path: path.clone(),
                field: field.name.clone(),
                direction: direction(value)?,
            });
        }
        return Ok(());
    }

    let target = schema.relation_target(field)?;
    path.push(field.name.clone());
    for (key, value) in map {
        self::field(schema, target, path.clone(), key, value, out)?;
    }
    Ok(())
}

fn aggregate(model: &Model, func: AggregateFunc, value: &Json, out: &mut Vec<OrderBy>) -> Result<()> {
    let Json::Object(map) = value else {
        return Err(Error::invalid_argument(format!(
            "ordering by `{}` needs an object of fields, got `{value}`",
            func.key()
        )));
    };
    for (key, value) in map {
        let field = match key.as_str() {
            "_all" if func == AggregateFunc::Count => None,
            name => Some(model.require_field(name)?.name.clone()),
        };
        out.push(OrderBy::Aggregate {
            func,
            field,
            direction: direction(value)?,
        });
    }
    Ok(())
}

fn direction(value: &Json) -> Result<Direction> {
    match value.as_str() {
        Some("asc") => Ok(Direction::Asc),
        Some("desc") => Ok(Direction::Desc),
        _ => Err(Error::invalid_argument(format!(
            "sort order must be \"asc\" or \"desc\", got `{value}`"
        ))),
    }
}

/// `"asc"`, or `{ sort: "asc", nulls: "last" }`.
fn sort(value: &Json) -> Result<(Direction, Option<NullsOrder>)> {
    let Json::Object(map) = value else {
        return Ok((direction(value)?, None));
    };

    let sort = map
        .get("sort")
        .ok_or_else(|| Error::invalid_argument("sort object is missing `sort`"))?;
    let nulls = match map.get("nulls").and_then(Json::as_str) {
        None => None,
        Some("first") => Some(NullsOrder::First),
        Some("last") => Some(NullsOrder::Last),
        Some(other) => {
            return Err(Error::invalid_argument(format!(
                "`nulls` must be \"first\" or \"last\", got `{other}`"
            )))
        }
    };
    Ok((direction(sort)?, nulls))
}
