use super::{id_filter, not_found, row_id, scope_expr, Exec, RowId, Scope};
use crate::{
    engine::args::{Args, Filter, Json, ReadArgs, RelationFilter, Selection},
    Result,
};

use async_recursion::async_recursion;
use kiln_core::{
    schema::{Field, Model, ReferentialAction},
    stmt::Delete,
    Error,
};
use serde_json::json;

impl<'a> Exec<'a> {
    pub(super) async fn delete(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let filter = Filter::parse_unique(self.schema(), model, &args.require("where")?)?;
        let selection = Selection::take(self.schema(), model, &mut args)?;
        args.finish("delete")?;

        // The result is the row as it was before the delete.
        let read = ReadArgs {
            filter: Some(filter),
            selection,
            take: Some(1),
            ..ReadArgs::default()
        };
        let Some(row) = self.read_objects(model, &read).await?.pop() else {
            return Err(not_found(model, "delete"));
        };
        let id = row_id(model, &row);
        let shaped = self.shape(model, &read.selection, vec![row])?.pop().unwrap_or(Json::Null);

        self.delete_rows(model, vec![id]).await?;
        Ok(shaped)
    }

    pub(super) async fn delete_many(&mut self, model: &Model, mut args: Args) -> Result<Json> {
        let filter = match args.take("where") {
            None | Some(Json::Null) => None,
            Some(json) => Some(Filter::parse(self.schema(), model, &json)?),
        };
        let limit = args.take_u64("limit")?;
        args.finish("deleteMany")?;

        let hierarchy = model.is_delegate || model.has_base();
        if hierarchy && limit.is_some() {
            return Err(Error::invalid_argument(format!(
                "`limit` is not supported when deleting from delegate model `{}`",
                model.name
            )));
        }

        let count = if hierarchy || !self.explicit_cascades(model).is_empty() {
            let take = limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
            let ids = self.find_ids(model, filter, take).await?;
            self.delete_rows(model, ids).await?
        } else {
            let mut delete = Delete::new(model.table_name());
            (delete.filter, delete.limit) = self.bulk_scope(model, filter, limit)?;
            self.execute(delete).await?
        };
        Ok(json!({ "count": count }))
    }

    /// Deletes the rows `ids` through the root of their delegate hierarchy;
    /// sub-model rows go with it by cascade.
    #[async_recursion]
    pub(super) async fn delete_rows(&mut self, model: &Model, ids: Vec<RowId>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        for (child, field) in self.explicit_cascades(model) {
            let target = self.schema().relation_target(field)?;
            let filter = Filter::Relation {
                field: field.name.clone(),
                filter: RelationFilter::Is(Some(Box::new(id_filter(target, &ids)))),
            };
            let child_ids = self.find_ids(child, Some(filter), None).await?;
            self.delete_rows(child, child_ids).await?;
        }

        let root = self.schema().root_model(model);
        let mut delete = Delete::new(root.table_name());
        delete.filter = Some(scope_expr(root, Scope::Ids(ids)));
        self.execute(delete).await
    }

    /// Relations declared on a delegate sub-model that cascade deletes of
    /// `model` rows. The database only removes the sub-model's own row, so
    /// the engine deletes those rows through their base itself.
    pub(crate) fn explicit_cascades(&self, model: &Model) -> Vec<(&'a Model, &'a Field)> {
        let schema = self.schema();
        let mut out = vec![];
        for child in schema.models.values().filter(|child| child.has_base()) {
            for field in child.relation_fields().filter(|field| !field.is_inherited()) {
                let Some(relation) = &field.relation else {
                    continue;
                };
                if relation.fields.is_empty() || relation.on_delete != Some(ReferentialAction::Cascade) {
                    continue;
                }
                let Ok(target) = schema.relation_target(field) else {
                    continue;
                };
                if schema.is_same_or_descendant(model, target) || schema.is_same_or_descendant(target, model) {
                    out.push((child, field));
                }
            }
        }
        out
    }
}
