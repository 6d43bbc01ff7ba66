use super::Exec;
use crate::{
    engine::{
        args::{expect_object, one_or_many, AggregateItem, Args, Filter, Having, Json, OrderBy, ReadArgs},
        output,
    },
    Result,
};

use kiln_core::{schema::Model, Error, Schema};

impl Exec<'_> {
    pub(super) async fn count(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let select = args.take("select").filter(|select| !select.is_null());
        let read = paginated(self.schema(), model, &mut args, false)?;
        args.finish("count")?;

        let fields = match &select {
            None | Some(Json::Bool(true)) => None,
            Some(select) => Some(counted_fields(model, select)?),
        };

        let query = self
            .lower()
            .count(model, &read, fields.as_deref().unwrap_or(&[None]))?;
        let row = self
            .fetch(query.select, &query.columns)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok(match fields {
            None => row.get_or_null("_all").to_json(),
            Some(_) => output::nest_aliases(row),
        })
    }

    pub(super) async fn aggregate(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let items = AggregateItem::take_all(model, &mut args)?;
        let read = paginated(self.schema(), model, &mut args, false)?;
        args.finish("aggregate")?;

        let query = self.lower().aggregate(model, &read, &items)?;
        let row = self
            .fetch(query.select, &query.columns)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(output::nest_aliases(row))
    }

    pub(super) async fn group_by(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let by = group_keys(model, args.require("by")?)?;
        let having = match args.take("having") {
            None | Some(Json::Null) => None,
            Some(json) => Some(Having::parse(self.schema(), model, &json)?),
        };
        let items = AggregateItem::take_all(model, &mut args)?;
        let read = paginated(self.schema(), model, &mut args, true)?;
        args.finish("groupBy")?;

        for order in &read.order_by {
            if let OrderBy::Field { path, field, .. } = order {
                if !path.is_empty() || !by.contains(field) {
                    return Err(Error::invalid_argument(format!(
                        "`groupBy` can only order by fields in `by`, got `{field}`"
                    )));
                }
            }
        }

        let query = self
            .lower()
            .group_by(model, &read, &by, having.as_ref(), &items)?;
        let mut rows = self.fetch(query.select, &query.columns).await?;
        if query.in_memory.reverse {
            rows.reverse();
        }
        Ok(Json::Array(rows.into_iter().map(output::nest_aliases).collect()))
    }
}

/// `where`, `orderBy`, `skip` and `take`.
fn paginated(schema: &Schema, model: &Model, args: &mut Args, aggregates: bool) -> Result<ReadArgs> {
    let filter = match args.take("where") {
        None | Some(Json::Null) => None,
        Some(json) => Some(Filter::parse(schema, model, &json)?),
    };
    let order_by = match args.take("orderBy") {
        None | Some(Json::Null) => vec![],
        Some(json) => OrderBy::parse(schema, model, json, aggregates)?,
    };
    Ok(ReadArgs {
        filter,
        order_by,
        skip: args.take_u64("skip")?,
        take: args.take_i64("take")?,
        ..ReadArgs::default()
    })
}

/// `count({ select: { _all: true, name: true } })`
fn counted_fields(model: &Model, select: &Json) -> Result<Vec<Option<String>>> {
    let mut fields = vec![];
    for (key, enabled) in expect_object(select, "count `select`")? {
        match enabled {
            Json::Bool(true) => {}
            Json::Bool(false) => continue,
            other => {
                return Err(Error::invalid_argument(format!(
                    "count `select.{key}` must be a boolean, got `{other}`"
                )))
            }
        }
        if key == "_all" {
            fields.push(None);
            continue;
        }
        let field = model.require_field(key)?;
        if field.is_relation() {
            return Err(Error::invalid_argument(format!(
                "cannot count relation `{}.{key}`",
                model.name
            )));
        }
        fields.push(Some(field.name.clone()));
    }
    Ok(fields)
}

fn group_keys(model: &Model, by: Json) -> Result<Vec<String>> {
    let mut keys = vec![];
    for item in one_or_many(by) {
        let Some(name) = item.as_str() else {
            return Err(Error::invalid_argument(format!(
                "`by` entries must be field names, got `{item}`"
            )));
        };
        let field = model.require_field(name)?;
        if field.is_relation() {
            return Err(Error::invalid_argument(format!(
                "cannot group by relation `{}.{name}`",
                model.name
            )));
        }
        keys.push(field.name.clone());
    }
    if keys.is_empty() {
        return Err(Error::invalid_argument("`by` must name at least one field"));
    }
    Ok(keys)
}
