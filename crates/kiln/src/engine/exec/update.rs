use super::{not_found, scope_expr, Exec, RowId, Scope};
use crate::{
    engine::{
        args::{Args, Data, Filter, Json, ScalarWrite, Selection},
        defaults,
    },
    Result,
};

use async_recursion::async_recursion;
use kiln_core::{
    schema::Model,
    stmt::{BinaryOp, Expr, Update, Value},
    Error,
};
use serde_json::json;

impl<'a> Exec<'a> {
    pub(super) async fn update(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let filter = Filter::parse_unique(self.schema(), model, &args.require("where")?)?;
        let data = Data::parse_update(self.schema(), model, &args.require("data")?)?;
        let selection = Selection::take(self.schema(), model, &mut args)?;
        args.finish("update")?;

        let Some(id) = self.find_ids(model, Some(filter), Some(1)).await?.pop() else {
            return Err(not_found(model, "update"));
        };
        let id = self.update_row(model, id, data).await?;
        self.read_one(model, &id, &selection).await
    }

    pub(super) async fn update_many(&mut self, model: &Model, mut args: Args, and_return: bool) -> Result<Json> {
        let context = if and_return { "updateManyAndReturn" } else { "updateMany" };
        let filter = match args.take("where") {
            None | Some(Json::Null) => None,
            Some(json) => Some(Filter::parse(self.schema(), model, &json)?),
        };
        let data = Data::parse_update(self.schema(), model, &args.require("data")?)?;
        let limit = args.take_u64("limit")?;
        let selection = if and_return {
            Selection::take(self.schema(), model, &mut args)?
        } else {
            Selection::default()
        };
        args.finish(context)?;

        if !data.relations.is_empty() {
            return Err(Error::invalid_argument(format!("`{context}` cannot write relations")));
        }

        let hierarchy = model.is_delegate || model.has_base();
        if and_return || hierarchy || data.scalars.is_empty() {
            let take = limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
            let ids = self.find_ids(model, filter, take).await?;
            let ids = self.write_scalars(model, ids, &data).await?;
            return if and_return {
                Ok(Json::Array(self.read_back(model, &ids, &selection).await?))
            } else {
                Ok(json!({ "count": ids.len() }))
            };
        }

        let mut update = Update::new(model.table_name());
        for (column, value) in self.assignments(model, &data) {
            update.set(column, value);
        }
        (update.filter, update.limit) = self.bulk_scope(model, filter, limit)?;
        let count = self.execute(update).await?;
        Ok(json!({ "count": count }))
    }

    /// Updates a single row with its nested relation writes and returns its
    /// id, which changes when `data` sets an id field.
    pub(super) async fn update_row(&mut self, model: &Model, id: RowId, data: Data) -> Result<RowId> {
        let ids = self.update_rows(model, vec![id], data).await?;
        ids.into_iter().next().ok_or_else(|| not_found(model, "update"))
    }

    /// Updates the rows `ids`. Relation writes need a single row.
    #[async_recursion]
    pub(super) async fn update_rows(&mut self, model: &Model, ids: Vec<RowId>, mut data: Data) -> Result<Vec<RowId>> {
        let mut relations = std::mem::take(&mut data.relations);
        if relations.is_empty() {
            return self.write_scalars(model, ids, &data).await;
        }

        let [id] = &ids[..] else {
            return Err(Error::invalid_argument(format!(
                "relation writes on `{}` need exactly one row",
                model.name
            )));
        };

        for (fk, value) in self.owning_writes(model, Some(id), &mut relations).await? {
            data.scalars.insert(fk, ScalarWrite::Set(value));
        }
        let ids = self.write_scalars(model, ids, &data).await?;
        if let [id] = &ids[..] {
            self.child_writes(model, id, relations).await?;
        }
        Ok(ids)
    }

    /// Applies the scalar writes of `data` table by table, delegate base
    /// first. Writes nothing when `data` changes no column.
    pub(super) async fn write_scalars(&mut self, model: &Model, ids: Vec<RowId>, data: &Data) -> Result<Vec<RowId>> {
        if data.scalars.is_empty() || ids.is_empty() {
            return Ok(ids);
        }

        let mut tables = self.schema().base_chain(model);
        tables.reverse();
        tables.push(model);

        let mut current = ids;
        for table in tables {
            let assignments = self.assignments(table, data);
            if assignments.is_empty() {
                continue;
            }
            let mut update = Update::new(table.table_name());
            for (column, value) in assignments {
                update.set(column, value);
            }
            update.filter = Some(scope_expr(table, Scope::Ids(current.clone())));
            self.execute(update).await?;

            // Sub-model ids follow the base through ON UPDATE CASCADE.
            current = moved_ids(table, current, data);
        }
        Ok(current)
    }

    /// `SET` assignments of `data` for the columns of `table`'s own table.
    pub(super) fn assignments(&self, table: &Model, data: &Data) -> Vec<(String, Expr)> {
        let mut out = vec![];
        for field in table.table_columns() {
            let column = Expr::bare_column(&field.name);
            let value = match data.scalars.get(&field.name) {
                Some(ScalarWrite::Set(value)) => Expr::Value(value.clone()),
                Some(ScalarWrite::Increment(value)) => Expr::binary_op(column, BinaryOp::Add, value.clone()),
                Some(ScalarWrite::Decrement(value)) => Expr::binary_op(column, BinaryOp::Sub, value.clone()),
                Some(ScalarWrite::Multiply(value)) => Expr::binary_op(column, BinaryOp::Mul, value.clone()),
                Some(ScalarWrite::Divide(value)) => Expr::binary_op(column, BinaryOp::Div, value.clone()),
                Some(ScalarWrite::Push(values)) => self.dialect().array_push(column, values.clone()),
                None if field.updated_at => Expr::Value(Value::DateTime(defaults::now())),
                None => continue,
            };
            out.push((field.name.clone(), value));
        }
        out
    }
}

/// Ids of the rows after `data` was written to `table`.
fn moved_ids(table: &Model, ids: Vec<RowId>, data: &Data) -> Vec<RowId> {
    let moved: Vec<(usize, &Value)> = table
        .id_fields
        .iter()
        .enumerate()
        .filter_map(|(i, name)| data.set_value(name).map(|value| (i, value)))
        .collect();
    if moved.is_empty() {
        return ids;
    }
    ids.into_iter()
        .map(|mut id| {
            for (i, value) in &moved {
                if let Some(slot) = id.get_mut(*i) {
                    *slot = (*value).clone();
                }
            }
            id
        })
        .collect()
}
