//! Nested relation writes.
//!
//! Writes on a relation whose foreign key lives on the parent row run before
//! the parent is inserted or updated and hand back the key values the parent
//! must store. All other relation writes run once the parent row exists.

use super::{id_filter, not_found, scope_expr, Exec, RowId, Scope};
use crate::{
    engine::{
        args::{Data, Filter, NestedAction, NestedUpdate, NestedUpsert, RelationFilter, ScalarWrite},
        lower::field_type,
    },
    Result,
};

use indexmap::IndexMap;
use kiln_core::{
    schema::{Field, ManyToMany, Model, RelationKeys},
    stmt::{Delete, Expr, Insert, OnConflict, Update, Value},
    Error,
};

/// Relation writes keyed by relation field, in payload order.
pub(super) type Relations = IndexMap<String, Vec<NestedAction>>;

/// Foreign-key columns of the parent row and the values they must take.
pub(super) type Pending = Vec<(String, Value)>;

/// Where a relation stores the link between two rows.
enum Link {
    /// Foreign key on the parent row.
    Owned(RelationKeys),

    /// Foreign key on the related rows.
    Child(RelationKeys),

    ManyToMany(ManyToMany),
}

impl<'a> Exec<'a> {
    fn link_of(&self, model: &Model, field: &Field) -> Result<Link> {
        if let Some(m2m) = self.schema().many_to_many(model, field)? {
            return Ok(Link::ManyToMany(m2m));
        }
        let keys = self.schema().relation_keys(model, field)?;
        Ok(if keys.owned_by_this() {
            Link::Owned(keys)
        } else {
            Link::Child(keys)
        })
    }

    /// Runs the writes on relations `model` holds the foreign key of and
    /// removes them from `relations`. `parent` is `None` while the parent row
    /// is yet to be inserted.
    pub(super) async fn owning_writes(
        &mut self,
        model: &Model,
        parent: Option<&RowId>,
        relations: &mut Relations,
    ) -> Result<Pending> {
        let mut pending = vec![];
        let names: Vec<String> = relations.keys().cloned().collect();

        for name in names {
            let field = model.require_field(&name)?;
            let Link::Owned(keys) = self.link_of(model, field)? else {
                continue;
            };
            let Some(actions) = relations.shift_remove(&name) else {
                continue;
            };
            for action in actions {
                self.owned_action(model, parent, field, &keys, action, &mut pending)
                    .await?;
            }
        }
        Ok(pending)
    }

    /// Runs the writes on relations stored on the related rows or in a join
    /// table, once the `parent` row exists.
    pub(super) async fn child_writes(&mut self, model: &Model, parent: &RowId, relations: Relations) -> Result<()> {
        for (name, actions) in relations {
            let field = model.require_field(&name)?;
            let link = self.link_of(model, field)?;
            if matches!(link, Link::Owned(_)) {
                continue;
            }
            for action in actions {
                tracing::trace!(relation = %name, action = action.name(), "nested write");
                self.related_action(model, parent, field, &link, action).await?;
            }
        }
        Ok(())
    }

    async fn owned_action(
        &mut self,
        model: &Model,
        parent: Option<&RowId>,
        field: &Field,
        keys: &RelationKeys,
        action: NestedAction,
        pending: &mut Pending,
    ) -> Result<()> {
        let target = self.schema().relation_target(field)?;
        let name = action.name();

        match action {
            NestedAction::Create(items) => {
                for data in items {
                    let id = self.create_row(target, data).await?;
                    self.point_at(model, parent, field, keys, &id, pending).await?;
                }
            }
            NestedAction::Connect(filters) => {
                for filter in filters {
                    let id = self.require_one(target, filter, "connect").await?;
                    self.point_at(model, parent, field, keys, &id, pending).await?;
                }
            }
            NestedAction::ConnectOrCreate(pairs) => {
                for (filter, data) in pairs {
                    let id = match self.find_one(target, filter).await? {
                        Some(id) => id,
                        None => self.create_row(target, data).await?,
                    };
                    self.point_at(model, parent, field, keys, &id, pending).await?;
                }
            }
            NestedAction::Disconnect(filters) => {
                let parent = existing(model, parent, name)?;
                for filter in filters {
                    if self.find_linked(model, parent, field, filter).await?.is_empty() {
                        continue;
                    }
                    require_optional(model, field, keys)?;
                    pending.extend(keys.fk_fields().map(|fk| (fk.to_string(), Value::Null)));
                }
            }
            NestedAction::Delete(filters) => {
                let parent = existing(model, parent, name)?;
                for filter in filters {
                    let ids = self.find_linked(model, parent, field, filter).await?;
                    if ids.is_empty() {
                        return Err(not_found(target, "delete"));
                    }
                    require_optional(model, field, keys)?;
                    let nulls: Vec<Value> = keys.pairs.iter().map(|_| Value::Null).collect();
                    self.assign_keys(model, keys, vec![parent.clone()], &nulls).await?;
                    self.delete_rows(target, ids).await?;
                }
            }
            NestedAction::Update(updates) => {
                let parent = existing(model, parent, name)?;
                for NestedUpdate { filter, data } in updates {
                    let Some(id) = self.find_linked(model, parent, field, filter).await?.into_iter().next() else {
                        return Err(not_found(target, "update"));
                    };
                    self.update_row(target, id, data).await?;
                }
            }
            NestedAction::Upsert(upserts) => {
                for NestedUpsert { filter, create, update } in upserts {
                    let linked = match parent {
                        Some(parent) => self.find_linked(model, parent, field, filter).await?.into_iter().next(),
                        None => None,
                    };
                    match linked {
                        Some(id) => {
                            self.update_row(target, id, update).await?;
                        }
                        None => {
                            let id = self.create_row(target, create).await?;
                            self.point_at(model, parent, field, keys, &id, pending).await?;
                        }
                    }
                }
            }
            NestedAction::CreateMany { .. }
            | NestedAction::Set(_)
            | NestedAction::UpdateMany(_)
            | NestedAction::DeleteMany(_) => {
                return Err(Error::invalid_argument(format!(
                    "`{name}` is not supported on to-one relation `{}.{}`",
                    model.name, field.name
                )))
            }
        }
        Ok(())
    }

    /// Records the key of the target row `id` for the parent to store. On a
    /// one-to-one relation any other parent holding that row lets go first.
    async fn point_at(
        &mut self,
        model: &Model,
        parent: Option<&RowId>,
        field: &Field,
        keys: &RelationKeys,
        id: &RowId,
        pending: &mut Pending,
    ) -> Result<()> {
        let target = self.schema().relation_target(field)?;
        let pk_fields: Vec<&str> = keys.pk_fields().collect();
        let values = self.key_values(target, id, &pk_fields).await?;

        let (_, opposite) = self.schema().opposite_field(model, field)?;
        if !opposite.is_to_many() {
            let mut holders = self
                .find_ids(
                    model,
                    Some(Filter::Relation {
                        field: field.name.clone(),
                        filter: RelationFilter::Is(Some(Box::new(id_filter(target, std::slice::from_ref(id))))),
                    }),
                    None,
                )
                .await?;
            holders.retain(|holder| Some(holder) != parent);
            if !holders.is_empty() {
                require_optional(model, field, keys)?;
                let nulls: Vec<Value> = keys.pairs.iter().map(|_| Value::Null).collect();
                self.assign_keys(model, keys, holders, &nulls).await?;
            }
        }

        for (pair, value) in keys.pairs.iter().zip(values) {
            pending.push((pair.fk.clone(), value));
        }
        Ok(())
    }

    /// A write on a relation stored on the related rows or a join table.
    async fn related_action(
        &mut self,
        model: &Model,
        parent: &RowId,
        field: &Field,
        link: &Link,
        action: NestedAction,
    ) -> Result<()> {
        let target = self.schema().relation_target(field)?;

        match action {
            NestedAction::Create(items) => {
                for data in items {
                    self.create_linked(model, parent, field, link, data).await?;
                }
            }
            NestedAction::CreateMany { data, skip_duplicates } => {
                if data.iter().any(|item| !item.relations.is_empty()) {
                    return Err(Error::invalid_argument("nested `createMany` cannot write relations"));
                }
                match link {
                    Link::Child(keys) => {
                        let values = self.parent_keys(model, parent, keys).await?;
                        let rows = data
                            .into_iter()
                            .map(|mut item| {
                                assign_foreign_keys(&mut item, keys, &values);
                                item
                            })
                            .collect();
                        self.insert_many(target, rows, skip_duplicates, false).await?;
                    }
                    _ => {
                        let (_, ids) = self.insert_many(target, data, skip_duplicates, true).await?;
                        self.attach(model, parent, field, link, ids).await?;
                    }
                }
            }
            NestedAction::Connect(filters) => {
                for filter in filters {
                    let id = self.require_one(target, filter, "connect").await?;
                    self.attach(model, parent, field, link, vec![id]).await?;
                }
            }
            NestedAction::ConnectOrCreate(pairs) => {
                for (filter, data) in pairs {
                    match self.find_one(target, filter).await? {
                        Some(id) => self.attach(model, parent, field, link, vec![id]).await?,
                        None => {
                            self.create_linked(model, parent, field, link, data).await?;
                        }
                    }
                }
            }
            NestedAction::Set(filters) => {
                let mut keep = vec![];
                for filter in filters {
                    keep.push(self.require_one(target, filter, "set").await?);
                }
                let current = self.find_linked(model, parent, field, Filter::And(vec![])).await?;
                let dropped: Vec<RowId> = current.iter().filter(|id| !keep.contains(id)).cloned().collect();
                let added: Vec<RowId> = keep.into_iter().filter(|id| !current.contains(id)).collect();
                self.detach(model, parent, field, link, dropped).await?;
                self.attach(model, parent, field, link, added).await?;
            }
            NestedAction::Disconnect(filters) => {
                for filter in filters {
                    let ids = self.find_linked(model, parent, field, filter).await?;
                    self.detach(model, parent, field, link, ids).await?;
                }
            }
            NestedAction::Delete(filters) => {
                for filter in filters {
                    let ids = self.find_linked(model, parent, field, filter).await?;
                    if ids.is_empty() {
                        return Err(not_found(target, "delete"));
                    }
                    self.delete_rows(target, ids).await?;
                }
            }
            NestedAction::Update(updates) => {
                for NestedUpdate { filter, data } in updates {
                    let Some(id) = self.find_linked(model, parent, field, filter).await?.into_iter().next() else {
                        return Err(not_found(target, "update"));
                    };
                    self.update_row(target, id, data).await?;
                }
            }
            NestedAction::UpdateMany(updates) => {
                for NestedUpdate { filter, data } in updates {
                    let ids = self.find_linked(model, parent, field, filter).await?;
                    self.update_rows(target, ids, data).await?;
                }
            }
            NestedAction::DeleteMany(filters) => {
                for filter in filters {
                    let ids = self.find_linked(model, parent, field, filter).await?;
                    self.delete_rows(target, ids).await?;
                }
            }
            NestedAction::Upsert(upserts) => {
                for NestedUpsert { filter, create, update } in upserts {
                    match self.find_linked(model, parent, field, filter).await?.into_iter().next() {
                        Some(id) => {
                            self.update_row(target, id, update).await?;
                        }
                        None => {
                            self.create_linked(model, parent, field, link, create).await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Creates a related row already linked to `parent`.
    async fn create_linked(
        &mut self,
        model: &Model,
        parent: &RowId,
        field: &Field,
        link: &Link,
        mut data: Data,
    ) -> Result<RowId> {
        let target = self.schema().relation_target(field)?;
        match link {
            Link::Child(keys) => {
                if !field.is_to_many() {
                    self.release_slot(model, parent, field, keys, None).await?;
                }
                let values = self.parent_keys(model, parent, keys).await?;
                assign_foreign_keys(&mut data, keys, &values);
                self.create_row(target, data).await
            }
            Link::ManyToMany(m2m) => {
                let id = self.create_row(target, data).await?;
                self.join(model, parent, m2m, vec![id.clone()]).await?;
                Ok(id)
            }
            Link::Owned(_) => self.create_row(target, data).await,
        }
    }

    /// Links existing related rows to `parent`.
    async fn attach(&mut self, model: &Model, parent: &RowId, field: &Field, link: &Link, ids: Vec<RowId>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        match link {
            Link::Child(keys) => {
                if !field.is_to_many() {
                    self.release_slot(model, parent, field, keys, ids.first()).await?;
                }
                let target = self.schema().relation_target(field)?;
                let values = self.parent_keys(model, parent, keys).await?;
                self.assign_keys(target, keys, ids, &values).await
            }
            Link::ManyToMany(m2m) => self.join(model, parent, m2m, ids).await,
            Link::Owned(_) => Ok(()),
        }
    }

    /// Unlinks related rows from `parent`, keeping the rows themselves.
    async fn detach(&mut self, model: &Model, parent: &RowId, field: &Field, link: &Link, ids: Vec<RowId>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        match link {
            Link::Child(keys) => {
                let target = self.schema().relation_target(field)?;
                let (_, opposite) = self.schema().opposite_field(model, field)?;
                require_optional(target, opposite, keys)?;
                let nulls: Vec<Value> = keys.pairs.iter().map(|_| Value::Null).collect();
                self.assign_keys(target, keys, ids, &nulls).await
            }
            Link::ManyToMany(m2m) => self.unjoin(model, parent, m2m, ids).await,
            Link::Owned(_) => Ok(()),
        }
    }

    /// Frees the single slot of a one-to-one relation before another row
    /// takes it.
    async fn release_slot(
        &mut self,
        model: &Model,
        parent: &RowId,
        field: &Field,
        keys: &RelationKeys,
        except: Option<&RowId>,
    ) -> Result<()> {
        let mut holders = self.find_linked(model, parent, field, Filter::And(vec![])).await?;
        holders.retain(|holder| Some(holder) != except);
        if holders.is_empty() {
            return Ok(());
        }

        let target = self.schema().relation_target(field)?;
        let (_, opposite) = self.schema().opposite_field(model, field)?;
        require_optional(target, opposite, keys)?;
        let nulls: Vec<Value> = keys.pairs.iter().map(|_| Value::Null).collect();
        self.assign_keys(target, keys, holders, &nulls).await
    }

    /// Sets the foreign-key columns of `keys` on the `holder` rows `ids`.
    async fn assign_keys(&mut self, holder: &Model, keys: &RelationKeys, ids: Vec<RowId>, values: &[Value]) -> Result<()> {
        let Some(first) = keys.pairs.first() else {
            return Ok(());
        };
        let table = self.table_of(holder, &first.fk)?;
        let mut update = Update::new(table.table_name());
        for (fk, value) in keys.fk_fields().zip(values) {
            update.set(fk, value.clone());
        }
        update.filter = Some(scope_expr(table, Scope::Ids(ids)));
        self.execute(update).await?;
        Ok(())
    }

    async fn join(&mut self, model: &Model, parent: &RowId, m2m: &ManyToMany, ids: Vec<RowId>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let parent_key = self.join_key(model, parent, &m2m.parent_id).await?;

        let mut insert = Insert::new(&m2m.join_table);
        insert.columns = vec![m2m.parent_column.to_string(), m2m.other_column.to_string()];
        insert.rows = ids
            .into_iter()
            .filter_map(|id| id.into_iter().next())
            .map(|other| vec![Expr::Value(parent_key.clone()), Expr::Value(other)])
            .collect();
        insert.on_conflict = Some(OnConflict::DoNothing);
        self.execute(insert).await?;
        Ok(())
    }

    async fn unjoin(&mut self, model: &Model, parent: &RowId, m2m: &ManyToMany, ids: Vec<RowId>) -> Result<()> {
        let parent_key = self.join_key(model, parent, &m2m.parent_id).await?;
        let others = ids
            .into_iter()
            .filter_map(|id| id.into_iter().next())
            .map(Expr::Value)
            .collect();

        let mut delete = Delete::new(&m2m.join_table);
        delete.filter = Some(Expr::and(
            Expr::eq(Expr::bare_column(m2m.parent_column), parent_key),
            Expr::in_list(Expr::bare_column(m2m.other_column), others),
        ));
        self.execute(delete).await?;
        Ok(())
    }

    async fn join_key(&mut self, model: &Model, parent: &RowId, id_field: &str) -> Result<Value> {
        let mut values = self.key_values(model, parent, &[id_field]).await?;
        values
            .pop()
            .ok_or_else(|| Error::invalid_schema(format!("`{}` has no field `{id_field}`", model.name)))
    }

    /// Values of the parent fields a child's foreign key references.
    async fn parent_keys(&mut self, model: &Model, parent: &RowId, keys: &RelationKeys) -> Result<Vec<Value>> {
        let pk_fields: Vec<&str> = keys.pk_fields().collect();
        self.key_values(model, parent, &pk_fields).await
    }

    /// Values of `fields` on the row `id`, read only when they are not part
    /// of the id.
    async fn key_values(&mut self, model: &Model, id: &RowId, fields: &[&str]) -> Result<Vec<Value>> {
        let positions: Option<Vec<usize>> = fields
            .iter()
            .map(|name| model.id_fields.iter().position(|id| id == name))
            .collect();
        if let Some(positions) = positions {
            return Ok(positions
                .into_iter()
                .map(|i| id.get(i).cloned().unwrap_or_default())
                .collect());
        }

        let mut lower = self.lower();
        let alias = lower.alias();
        let mut select = lower.select_from(model, &alias);
        select.filter = Some(lower.filter(model, &alias, &id_filter(model, std::slice::from_ref(id)))?);
        let mut ret = vec![];
        for name in fields {
            select.column(lower.column(model, &alias, name)?, *name);
            ret.push(field_type(model.require_field(name)?));
        }

        let row = self.query(select, ret).await?.into_iter().next();
        row.map(|row| row.into_vec()).ok_or_else(|| not_found(model, "link"))
    }

    /// Rows of the relation target linked to `parent` and matching `filter`.
    async fn find_linked(&mut self, model: &Model, parent: &RowId, field: &Field, filter: Filter) -> Result<Vec<RowId>> {
        let (target, opposite) = self.schema().opposite_field(model, field)?;
        let parent_filter = Box::new(id_filter(model, std::slice::from_ref(parent)));
        let linked = Filter::Relation {
            field: opposite.name.clone(),
            filter: if opposite.is_to_many() {
                RelationFilter::Some(parent_filter)
            } else {
                RelationFilter::Is(Some(parent_filter))
            },
        };
        let filter = if filter.is_empty() {
            linked
        } else {
            Filter::And(vec![linked, filter])
        };
        self.find_ids(target, Some(filter), None).await
    }

    async fn find_one(&mut self, model: &Model, filter: Filter) -> Result<Option<RowId>> {
        Ok(self.find_ids(model, Some(filter), Some(1)).await?.pop())
    }

    async fn require_one(&mut self, model: &Model, filter: Filter, action: &str) -> Result<RowId> {
        self.find_one(model, filter)
            .await?
            .ok_or_else(|| not_found(model, action))
    }
}

fn existing<'r>(model: &Model, parent: Option<&'r RowId>, action: &str) -> Result<&'r RowId> {
    parent.ok_or_else(|| {
        Error::invalid_argument(format!(
            "nested `{action}` needs an existing `{}` row",
            model.name
        ))
    })
}

/// Fails unless every foreign-key column of `keys` on `holder` accepts null.
fn require_optional(holder: &Model, field: &Field, keys: &RelationKeys) -> Result<()> {
    let optional = keys
        .fk_fields()
        .all(|fk| holder.field(fk).is_some_and(|fk| fk.optional));
    if optional {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "the change would violate the required relation `{}.{}`",
            holder.name, field.name
        )))
    }
}

fn assign_foreign_keys(data: &mut Data, keys: &RelationKeys, values: &[Value]) {
    for (fk, value) in keys.fk_fields().zip(values) {
        data.scalars.insert(fk.to_string(), ScalarWrite::Set(value.clone()));
    }
}
