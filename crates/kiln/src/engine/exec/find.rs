use super::{id_filter, row_id, Exec, RowId};
use crate::{
    engine::{
        args::{Args, Filter, Json, ReadArgs, Selection},
        output::{self, Shape},
    },
    Result,
};

use kiln_core::{schema::Model, stmt::ValueObject, Error};

impl Exec<'_> {
    pub(super) async fn find_unique(&mut self, model: &Model, mut args: Args, or_throw: bool) -> Result<Json> {
        let filter = Filter::parse_unique(self.schema(), model, &args.require("where")?)?;
        let selection = Selection::take(self.schema(), model, &mut args)?;
        args.finish(if or_throw { "findUniqueOrThrow" } else { "findUnique" })?;

        let read = ReadArgs {
            filter: Some(filter),
            selection,
            take: Some(1),
            ..ReadArgs::default()
        };
        let row = self.read(model, &read).await?.into_iter().next();
        single(model, row, or_throw)
    }

    pub(super) async fn find_first(&mut self, model: &Model, mut args: Args, or_throw: bool) -> Result<Json> {
        let mut read = ReadArgs::take(self.schema(), model, &mut args)?;
        args.finish(if or_throw { "findFirstOrThrow" } else { "findFirst" })?;

        read.take = Some(match read.take {
            Some(take) if take < 0 => -1,
            _ => 1,
        });
        let row = self.read(model, &read).await?.into_iter().next();
        single(model, row, or_throw)
    }

    pub(super) async fn find_many(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let read = ReadArgs::take(self.schema(), model, &mut args)?;
        args.finish("findMany")?;
        Ok(Json::Array(self.read(model, &read).await?))
    }

    /// Reads and shapes rows of `model`.
    pub(super) async fn read(&mut self, model: &Model, read: &ReadArgs) -> Result<Vec<Json>> {
        let rows = self.read_objects(model, read).await?;
        self.shape(model, &read.selection, rows)
    }

    /// Reads rows keyed by column, id columns included, with in-memory
    /// post-processing applied.
    pub(super) async fn read_objects(&mut self, model: &Model, read: &ReadArgs) -> Result<Vec<ValueObject>> {
        let query = self.lower().read(model, read)?;
        let rows = self.fetch(query.select, &query.columns).await?;
        Ok(output::apply_in_memory(rows, &query.in_memory, |row, name| {
            row.get_or_null(name).to_json()
        }))
    }

    /// Reads the rows `ids` back after a write, in the order given.
    pub(super) async fn read_back(
        &mut self,
        model: &Model,
        ids: &[RowId],
        selection: &Selection,
    ) -> Result<Vec<Json>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let read = ReadArgs {
            filter: Some(id_filter(model, ids)),
            selection: selection.clone(),
            ..ReadArgs::default()
        };
        let mut rows = self.read_objects(model, &read).await?;
        rows.sort_by_key(|row| {
            let id = row_id(model, row);
            ids.iter().position(|candidate| *candidate == id).unwrap_or(usize::MAX)
        });
        self.shape(model, selection, rows)
    }

    /// Reads back the single row `id`, failing when it vanished.
    pub(super) async fn read_one(&mut self, model: &Model, id: &RowId, selection: &Selection) -> Result<Json> {
        let row = self
            .read_back(model, std::slice::from_ref(id), selection)
            .await?
            .into_iter()
            .next();
        single(model, row, true)
    }

    pub(super) fn shape(&self, model: &Model, selection: &Selection, rows: Vec<ValueObject>) -> Result<Vec<Json>> {
        let shape = Shape::new(self.schema());
        rows.into_iter()
            .map(|row| shape.row(model, selection, row))
            .collect()
    }
}

fn single(model: &Model, row: Option<Json>, or_throw: bool) -> Result<Json> {
    match row {
        Some(row) => Ok(row),
        None if or_throw => Err(Error::record_not_found(format!("no `{}` record found", model.name))),
        None => Ok(Json::Null),
    }
}
