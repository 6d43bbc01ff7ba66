use super::Lower;

use kiln_core::{
    schema::{Field, Model},
    stmt::{Expr, Join, Select, TableRef},
    Error, Result,
};

/// Alias of a delegate base or sub-model table joined to `alias`.
pub(crate) fn joined_alias(alias: &str, model: &str) -> String {
    format!("{alias}${model}")
}

impl Lower<'_> {
    /// The model's own table plus inner joins to every delegate base.
    pub(crate) fn source(&self, model: &Model, alias: &str) -> (TableRef, Vec<Join>) {
        let table = TableRef::table(model.table_name(), alias);
        let joins = self
            .schema
            .base_chain(model)
            .into_iter()
            .map(|base| {
                let base_alias = joined_alias(alias, &base.name);
                let on = self.id_match(model, alias, &base_alias);
                Join::inner(TableRef::table(base.table_name(), base_alias), on)
            })
            .collect();
        (table, joins)
    }

    pub(crate) fn select_from(&self, model: &Model, alias: &str) -> Select {
        let (table, joins) = self.source(model, alias);
        let mut select = Select::from_table(table);
        select.joins = joins;
        select
    }

    /// Left joins every sub-model table so a read of a delegate base sees
    /// subtype columns.
    pub(crate) fn polymorphic_joins(&self, model: &Model, alias: &str) -> Vec<Join> {
        self.schema
            .descendants(model)
            .into_iter()
            .map(|sub| {
                let sub_alias = joined_alias(alias, &sub.name);
                let on = self.id_match(model, alias, &sub_alias);
                Join::left(TableRef::table(sub.table_name(), sub_alias), on)
            })
            .collect()
    }

    fn id_match(&self, model: &Model, lhs: &str, rhs: &str) -> Expr {
        Expr::and_from_vec(
            model
                .id_fields
                .iter()
                .map(|id| Expr::eq(Expr::column(lhs, id), Expr::column(rhs, id)))
                .collect(),
        )
    }

    /// The column expression storing `name`, resolving inherited fields to
    /// the base table that declares them.
    pub(crate) fn column(&self, model: &Model, alias: &str, name: &str) -> Result<Expr> {
        let field = model.require_field(name)?;
        if field.is_relation() {
            return Err(Error::invalid_argument(format!(
                "relation `{}.{name}` is not a column",
                model.name
            )));
        }
        Ok(self.field_column(alias, field))
    }

    pub(crate) fn field_column(&self, alias: &str, field: &Field) -> Expr {
        match &field.origin_model {
            Some(origin) if !field.id => Expr::column(joined_alias(alias, origin), &field.name),
            _ => Expr::column(alias, &field.name),
        }
    }

    /// Correlates `child` rows (aliased `child_alias`) with the `parent` row
    /// through `field`.
    pub(crate) fn link(
        &self,
        parent: &Model,
        parent_alias: &str,
        field: &Field,
        child: &Model,
        child_alias: &str,
    ) -> Result<Expr> {
        if let Some(m2m) = self.schema.many_to_many(parent, field)? {
            let join_alias = format!("{child_alias}_j");
            let mut select = Select::from_table(TableRef::table(&m2m.join_table, &join_alias));
            select.column(Expr::column(&join_alias, m2m.other_column), m2m.other_column);
            select.filter = Some(Expr::eq(
                Expr::column(&join_alias, m2m.parent_column),
                self.column(parent, parent_alias, &m2m.parent_id)?,
            ));
            return Ok(Expr::in_subquery(
                self.column(child, child_alias, &m2m.other_id)?,
                select,
            ));
        }

        let keys = self.schema.relation_keys(parent, field)?;
        let mut pairs = vec![];
        for pair in &keys.pairs {
            let (parent_col, child_col) = if keys.owned_by_this() {
                (&pair.fk, &pair.pk)
            } else {
                (&pair.pk, &pair.fk)
            };
            pairs.push(Expr::eq(
                self.column(child, child_alias, child_col)?,
                self.column(parent, parent_alias, parent_col)?,
            ));
        }
        Ok(Expr::and_from_vec(pairs))
    }

    /// `SELECT .. FROM child WHERE link(parent, child)`, the starting point
    /// of every correlated relation subquery.
    pub(crate) fn related(
        &mut self,
        parent: &Model,
        parent_alias: &str,
        field: &Field,
    ) -> Result<(Select, String)> {
        let child = self.schema.relation_target(field)?;
        let child_alias = self.alias();
        let mut select = self.select_from(child, &child_alias);
        select.filter = Some(self.link(parent, parent_alias, field, child, &child_alias)?);
        Ok((select, child_alias))
    }
}
