use super::Exec;
use crate::{
    engine::args::{Args, Data, Filter, Json, Selection},
    Result,
};

use kiln_core::schema::Model;

impl Exec<'_> {
    /// Updates the row matching the unique `where`, or creates it.
    pub(super) async fn upsert(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let filter = Filter::parse_unique(self.schema(), model, &args.require("where")?)?;
        let create = Data::parse_create(self.schema(), model, &args.require("create")?)?;
        let update = Data::parse_update(self.schema(), model, &args.require("update")?)?;
        let selection = Selection::take(self.schema(), model, &mut args)?;
        args.finish("upsert")?;

        let id = match self.find_ids(model, Some(filter), Some(1)).await?.pop() {
            Some(id) => self.update_row(model, id, update).await?,
            None => self.create_row(model, create).await?,
        };
        self.read_one(model, &id, &selection).await
    }
}
