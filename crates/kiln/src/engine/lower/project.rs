use super::{field_type, source::joined_alias, Lower};
use crate::engine::args::{CountItem, Filter, ReadArgs, Selected, Selection};

use kiln_core::{
    schema::{Field, Model},
    stmt::{Expr, Select, TableRef, Type},
    Result,
};

/// One column of a lowered read. The select item is aliased `key`, and the
/// driver decodes it as `ty`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub(crate) key: String,
    pub(crate) ty: Type,
}

/// Key of the `_count` entry for `field` in a flat row.
pub(crate) fn count_key(field: &str) -> String {
    format!("_count.{field}")
}

/// Key of a sub-model column in a polymorphic row.
pub(crate) fn sub_model_key(sub_model: &str, field: &str) -> String {
    format!("{sub_model}${field}")
}

impl Lower<'_> {
    /// Appends the columns of `selection` to `select`, skipping keys that are
    /// already present.
    pub(crate) fn project(
        &mut self,
        model: &Model,
        alias: &str,
        selection: &Selection,
        select: &mut Select,
        columns: &mut Vec<Column>,
    ) -> Result<()> {
        let mut push = |select: &mut Select, key: String, expr: Expr, ty: Type| {
            if columns.iter().any(|column| column.key == key) {
                return;
            }
            select.column(expr, key.clone());
            columns.push(Column { key, ty });
        };

        for item in &selection.items {
            match item {
                Selected::Scalar(name) => {
                    let field = model.require_field(name)?;
                    push(select, name.clone(), self.field_column(alias, field), field_type(field));
                }
                Selected::Relation { field, args } => {
                    let field = model.require_field(field)?;
                    let expr = self.relation_json(model, alias, field, args)?;
                    push(select, field.name.clone(), expr, Type::Json);
                }
                Selected::Count(items) => {
                    for item in items {
                        let expr = self.relation_count(model, alias, item)?;
                        push(select, count_key(&item.field), expr, Type::I64);
                    }
                }
            }
        }

        if selection.polymorphic {
            for (key, expr, field) in self.sub_model_columns(model, alias) {
                push(select, key, expr, field_type(field));
            }
        }

        Ok(())
    }

    /// The discriminator and every sub-model's own columns, keyed for the
    /// post-processor.
    fn sub_model_columns<'s>(&'s self, model: &'s Model, alias: &str) -> Vec<(String, Expr, &'s Field)> {
        let mut out = vec![];
        if let Some(field) = self.schema.discriminator(model) {
            out.push((field.name.clone(), self.field_column(alias, field), field));
        }
        for sub in self.schema.descendants(model) {
            let sub_alias = joined_alias(alias, &sub.name);
            for field in sub.scalar_fields().filter(|f| !f.is_inherited() && !f.id) {
                out.push((
                    sub_model_key(&sub.name, &field.name),
                    Expr::column(&sub_alias, &field.name),
                    field,
                ));
            }
        }
        out
    }

    /// A JSON object with the selected fields of one row.
    fn json_object(&mut self, model: &Model, alias: &str, selection: &Selection) -> Result<Expr> {
        let mut entries: Vec<(String, Expr)> = vec![];

        for item in &selection.items {
            match item {
                Selected::Scalar(name) => {
                    let field = model.require_field(name)?;
                    let column = self.field_column(alias, field);
                    entries.push((name.clone(), self.dialect.json_field(column, field)));
                }
                Selected::Relation { field, args } => {
                    let field = model.require_field(field)?;
                    let expr = self.relation_json(model, alias, field, args)?;
                    entries.push((field.name.clone(), Expr::as_json(expr)));
                }
                Selected::Count(items) => {
                    let mut counts = vec![];
                    for item in items {
                        counts.push((item.field.clone(), self.relation_count(model, alias, item)?));
                    }
                    entries.push(("_count".to_string(), Expr::json_object(counts)));
                }
            }
        }

        if selection.polymorphic {
            for (key, expr, field) in self.sub_model_columns(model, alias) {
                if entries.iter().all(|(existing, _)| *existing != key) {
                    entries.push((key, self.dialect.json_field(expr, field)));
                }
            }
        }

        Ok(Expr::json_object(entries))
    }

    /// A correlated subquery producing the related row (to-one) or array
    /// of rows (to-many) as JSON.
    fn relation_json(
        &mut self,
        model: &Model,
        alias: &str,
        field: &Field,
        args: &ReadArgs,
    ) -> Result<Expr> {
        let target = self.schema.relation_target(field)?;
        let (mut inner, child) = self.related(model, alias, field)?;
        if let Some(filter) = self.filter_opt(target, &child, args.filter.as_ref())? {
            inner.and_filter(filter);
        }
        if args.selection.polymorphic {
            inner.joins.extend(self.polymorphic_joins(target, &child));
        }
        // De-duplication happens on the JSON rows, so distinct fields must be
        // present even when not selected.
        let mut selection = args.selection.clone();
        for name in &args.distinct {
            if !selection.contains_scalar(name) {
                selection.items.push(Selected::Scalar(name.clone()));
            }
        }
        let object = self.json_object(target, &child, &selection)?;
        inner.column(object, "j");

        if !field.is_to_many() {
            inner.limit = Some(1);
            return Ok(Expr::subquery(inner));
        }

        // Distinct relation reads are paginated after de-duplication.
        let paged = args.distinct.is_empty();
        let order = super::order::effective(target, &args.order_by, args.take, paged && args.is_paginated());
        inner.order_by = self.order_by(target, &child, &order)?;
        if paged {
            inner.limit = args.take.map(i64::unsigned_abs);
            inner.offset = args.skip;
        }

        let sub = format!("{child}_s");
        let rows = Expr::as_json(Expr::column(&sub, "j"));
        let mut outer = Select::from_table(TableRef::subquery(inner, &sub));
        outer.column(
            Expr::coalesce(vec![Expr::json_array_agg(rows), Expr::json_empty_array()]),
            "j",
        );
        Ok(Expr::subquery(outer))
    }

    fn relation_count(&mut self, model: &Model, alias: &str, item: &CountItem) -> Result<Expr> {
        let field = model.require_field(&item.field)?;
        let target = self.schema.relation_target(field)?;
        let every = Filter::And(vec![]);
        let filter = item.filter.as_ref().unwrap_or(&every);
        self.related_count(model, alias, field, target, filter, false)
    }
}
