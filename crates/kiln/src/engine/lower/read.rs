use super::{field_type, order, Column, Lower};
use crate::engine::args::ReadArgs;

use kiln_core::{
    schema::Model,
    stmt::{Direction, Distinct, Expr, OrderByExpr, Select},
    Result,
};

/// A lowered model read.
#[derive(Debug)]
pub(crate) struct Query {
    pub(crate) select: Select,
    pub(crate) columns: Vec<Column>,
    pub(crate) in_memory: InMemory,
}

/// Work left to the post-processor after the rows are fetched.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct InMemory {
    /// Restore the requested order after reading backwards.
    pub(crate) reverse: bool,

    /// Fields rows are de-duplicated on, first occurrence wins.
    pub(crate) distinct: Vec<String>,
    pub(crate) skip: Option<u64>,
    pub(crate) take: Option<u64>,
}

impl Lower<'_> {
    /// Lowers a read of `model`. Id columns are always fetched, even when
    /// not selected.
    pub(crate) fn read(&mut self, model: &Model, args: &ReadArgs) -> Result<Query> {
        let alias = self.alias();
        let mut select = self.select_from(model, &alias);
        if args.selection.polymorphic {
            select.joins.extend(self.polymorphic_joins(model, &alias));
        }
        select.filter = self.filter_opt(model, &alias, args.filter.as_ref())?;

        let mut columns = vec![];
        self.project(model, &alias, &args.selection, &mut select, &mut columns)?;
        for name in model.id_fields.iter().chain(&args.distinct) {
            if columns.iter().all(|column| column.key != *name) {
                let field = model.require_field(name)?;
                select.column(self.field_column(&alias, field), name.clone());
                columns.push(Column {
                    key: name.clone(),
                    ty: field_type(field),
                });
            }
        }

        let mut in_memory = InMemory {
            reverse: args.take.is_some_and(|take| take < 0),
            ..InMemory::default()
        };
        let take = args.take.map(i64::unsigned_abs);

        if args.distinct.is_empty() {
            let order = order::effective(model, &args.order_by, args.take, args.is_paginated());
            select.order_by = self.order_by(model, &alias, &order)?;
            select.limit = take;
            select.offset = args.skip;
        } else if self.capability.distinct_on && args.order_by.is_empty() {
            let mut on = vec![];
            for name in &args.distinct {
                on.push(self.column(model, &alias, name)?);
            }
            let direction = if in_memory.reverse { Direction::Desc } else { Direction::Asc };
            select.order_by = on
                .iter()
                .cloned()
                .map(|expr| OrderByExpr::new(expr, direction))
                .collect();
            select.distinct = Some(Distinct::On(on));
            select.limit = take;
            select.offset = args.skip;
        } else {
            let order = order::effective(model, &args.order_by, args.take, false);
            select.order_by = self.order_by(model, &alias, &order)?;
            in_memory.distinct = args.distinct.clone();
            in_memory.skip = args.skip;
            in_memory.take = take;
        }

        Ok(Query {
            select,
            columns,
            in_memory,
        })
    }

    /// `FROM model WHERE filter ORDER BY .. LIMIT .. OFFSET ..` with an empty
    /// projection.
    pub(crate) fn filtered(&mut self, model: &Model, args: &ReadArgs) -> Result<(Select, String)> {
        let alias = self.alias();
        let mut select = self.select_from(model, &alias);
        select.filter = self.filter_opt(model, &alias, args.filter.as_ref())?;
        let order = order::effective(model, &args.order_by, args.take, args.is_paginated());
        select.order_by = self.order_by(model, &alias, &order)?;
        select.limit = args.take.map(i64::unsigned_abs);
        select.offset = args.skip;
        Ok((select, alias))
    }

    /// `SELECT ids FROM model WHERE filter`, for resolving the rows a
    /// mutation touches.
    pub(crate) fn select_ids(&mut self, model: &Model, args: &ReadArgs) -> Result<(Select, String)> {
        let (mut select, alias) = self.filtered(model, args)?;
        for id in &model.id_fields {
            select.column(Expr::column(&alias, id), id.clone());
        }
        Ok((select, alias))
    }
}
