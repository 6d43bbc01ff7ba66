use super::{Exec, RowId};
use crate::{
    engine::{
        args::{one_or_many, Args, Data, Json, ScalarWrite, Selection},
        defaults, lower,
    },
    Result,
};

use async_recursion::async_recursion;
use kiln_core::{
    schema::{Field, Model},
    stmt::{Expr, Insert, OnConflict, Select, SelectItem, Type, Value, ValueRecord},
    Error,
};
use serde_json::json;

impl<'a> Exec<'a> {
    pub(super) async fn create(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let data = Data::parse_create(self.schema(), model, &args.require("data")?)?;
        let selection = Selection::take(self.schema(), model, &mut args)?;
        args.finish("create")?;

        let id = self.create_row(model, data).await?;
        self.read_one(model, &id, &selection).await
    }

    pub(super) async fn create_many(&mut self, model: &Model, mut args: Args, and_return: bool) -> Result<Json> {
        let context = if and_return { "createManyAndReturn" } else { "createMany" };
        let items = one_or_many(args.require("data")?);
        let skip_duplicates = args.take_bool("skipDuplicates")?;
        let selection = if and_return {
            Selection::take(self.schema(), model, &mut args)?
        } else {
            Selection::default()
        };
        args.finish(context)?;

        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            let data = Data::parse_create(self.schema(), model, item)?;
            if !data.relations.is_empty() {
                return Err(Error::invalid_argument(format!("`{context}` cannot write relations")));
            }
            rows.push(data);
        }

        let (count, ids) = self.insert_many(model, rows, skip_duplicates, and_return).await?;
        if and_return {
            Ok(Json::Array(self.read_back(model, &ids, &selection).await?))
        } else {
            Ok(json!({ "count": count }))
        }
    }

    /// Creates one row with its nested relation writes and returns its id.
    ///
    /// Relations whose foreign key lives on `model` are written first so the
    /// insert can store their keys; every other relation is written once the
    /// row exists.
    #[async_recursion]
    pub(super) async fn create_row(&mut self, model: &Model, mut data: Data) -> Result<RowId> {
        if model.is_delegate {
            return Err(Error::invalid_argument(format!(
                "`{}` is a delegate model; create one of its sub-models instead",
                model.name
            )));
        }

        let mut relations = std::mem::take(&mut data.relations);
        for (fk, value) in self.owning_writes(model, None, &mut relations).await? {
            data.scalars.insert(fk, ScalarWrite::Set(value));
        }

        let id = self
            .insert_hierarchy(model, &data, false)
            .await?
            .ok_or_else(|| Error::record_not_found(format!("`{}` row was not inserted", model.name)))?;

        self.child_writes(model, &id, relations).await?;
        Ok(id)
    }

    /// Inserts rows carrying scalar data only. Returns the number of rows
    /// written and, when `want_ids` is set, their ids.
    pub(super) async fn insert_many(
        &mut self,
        model: &Model,
        rows: Vec<Data>,
        skip_duplicates: bool,
        want_ids: bool,
    ) -> Result<(u64, Vec<RowId>)> {
        if model.is_delegate {
            return Err(Error::invalid_argument(format!(
                "`{}` is a delegate model; create one of its sub-models instead",
                model.name
            )));
        }
        if rows.is_empty() {
            return Ok((0, vec![]));
        }

        let capability = self.engine.capability;
        let row_by_row = model.has_base() || (want_ids && !capability.returning) || rows.len() == 1;

        if row_by_row {
            let mut ids = vec![];
            for data in &rows {
                if let Some(id) = self.insert_hierarchy(model, data, skip_duplicates).await? {
                    ids.push(id);
                }
            }
            return Ok((ids.len() as u64, ids));
        }

        let fields: Vec<&Field> = model.table_columns().collect();
        let mut matrix = Vec::with_capacity(rows.len());
        for data in &rows {
            let row = fields
                .iter()
                .map(|field| self.column_value(field, data))
                .collect::<Result<Vec<_>>>()?;
            matrix.push(row);
        }

        // A column no row assigns is left to the database.
        let used: Vec<usize> = (0..fields.len())
            .filter(|&i| matrix.iter().any(|row| row[i].is_some()))
            .collect();

        // `DEFAULT VALUES` inserts a single row.
        if used.is_empty() {
            let mut ids = vec![];
            for _ in &rows {
                if let Some(id) = self.insert_row(model, vec![], skip_duplicates).await? {
                    ids.push(id);
                }
            }
            return Ok((ids.len() as u64, ids));
        }

        let mut insert = Insert::new(model.table_name());
        insert.columns = used.iter().map(|&i| fields[i].name.clone()).collect();
        insert.rows = matrix
            .into_iter()
            .map(|mut row| {
                used.iter()
                    .map(|&i| match row[i].take() {
                        Some(value) => Expr::Value(value),
                        None if capability.default_in_bulk_insert => Expr::Default,
                        None => Expr::null(),
                    })
                    .collect()
            })
            .collect();
        if skip_duplicates {
            insert.on_conflict = Some(OnConflict::DoNothing);
        }

        if !want_ids {
            let count = self.execute(insert).await?;
            return Ok((count, vec![]));
        }

        insert.returning = id_returning(model);
        let ret = model.id_fields().map(lower::field_type).collect();
        let ids: Vec<RowId> = self
            .query(insert, ret)
            .await?
            .into_iter()
            .map(ValueRecord::into_vec)
            .collect();
        Ok((ids.len() as u64, ids))
    }

    /// Inserts the row into every table of the delegate chain ending at
    /// `model`, base first. `None` when a duplicate was skipped.
    pub(super) async fn insert_hierarchy(
        &mut self,
        model: &Model,
        data: &Data,
        skip_duplicates: bool,
    ) -> Result<Option<RowId>> {
        let mut tables = self.schema().base_chain(model);
        tables.reverse();
        tables.push(model);

        let mut id: Option<RowId> = None;
        for table in tables {
            let mut values = vec![];
            for field in table.table_columns() {
                let inherited_id = id.as_ref().and_then(|id| {
                    table
                        .id_fields
                        .iter()
                        .position(|name| *name == field.name)
                        .and_then(|i| id.get(i).cloned())
                });
                let value = if let Some(value) = inherited_id {
                    Some(value)
                } else if table.discriminator.as_deref() == Some(field.name.as_str()) {
                    Some(Value::from(model.name.as_str()))
                } else {
                    self.column_value(field, data)?
                };
                if let Some(value) = value {
                    values.push((field.name.clone(), value));
                }
            }

            match self.insert_row(table, values, skip_duplicates).await? {
                Some(row) => id = Some(row),
                None => return Ok(None),
            }
        }
        Ok(id)
    }

    /// The value a new row stores for `field`: the caller's, the update
    /// timestamp, or the generated default. `None` leaves it to the database.
    fn column_value(&self, field: &Field, data: &Data) -> Result<Option<Value>> {
        if let Some(write) = data.scalars.get(&field.name) {
            return match write {
                ScalarWrite::Set(value) => Ok(Some(value.clone())),
                _ => Err(Error::invalid_argument(format!(
                    "field `{}` only accepts a value on create",
                    field.name
                ))),
            };
        }
        if field.updated_at {
            return Ok(Some(Value::DateTime(defaults::now())));
        }

        let value = defaults::generate(self.schema(), field)?;
        if value.is_none() && field.default.is_none() && !field.optional {
            return Err(Error::invalid_argument(format!(
                "missing required field `{}`",
                field.name
            )));
        }
        Ok(value)
    }

    /// Inserts a single row into `table` and returns its id, `None` when a
    /// skipped duplicate wrote nothing.
    async fn insert_row(
        &mut self,
        table: &Model,
        values: Vec<(String, Value)>,
        skip_duplicates: bool,
    ) -> Result<Option<RowId>> {
        let known: Option<RowId> = table
            .id_fields
            .iter()
            .map(|id| values.iter().find(|(name, _)| name == id).map(|(_, value)| value.clone()))
            .collect();

        let mut insert = Insert::new(table.table_name());
        let (columns, row) = values
            .into_iter()
            .map(|(name, value)| (name, Expr::Value(value)))
            .unzip();
        insert.columns = columns;
        insert.rows = vec![row];
        if skip_duplicates {
            insert.on_conflict = Some(OnConflict::DoNothing);
        }

        if let Some(id) = known {
            let count = self.execute(insert).await?;
            return Ok((count > 0).then_some(id));
        }

        let ret: Vec<Type> = table.id_fields().map(lower::field_type).collect();
        if self.engine.capability.returning {
            insert.returning = id_returning(table);
            let rows = self.query(insert, ret).await?;
            return Ok(rows.into_iter().next().map(ValueRecord::into_vec));
        }

        if self.execute(insert).await? == 0 {
            return Ok(None);
        }
        let Some(last_id) = self.dialect().last_insert_id() else {
            return Err(Error::unsupported_feature(format!(
                "cannot read back the generated id of `{}`",
                table.name
            )));
        };
        let mut select = Select::default();
        select.column(last_id, "id");
        let rows = self.query(select, ret).await?;
        Ok(rows.into_iter().next().map(ValueRecord::into_vec))
    }
}

fn id_returning(model: &Model) -> Vec<SelectItem> {
    model
        .id_fields
        .iter()
        .map(|id| SelectItem::aliased(Expr::bare_column(id), id.clone()))
        .collect()
}
