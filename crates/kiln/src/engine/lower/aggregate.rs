use super::{field_type, order::aggregate_of, Column, InMemory, Lower, Query};
use crate::engine::args::{AggregateItem, Having, OrderBy, ReadArgs};

use kiln_core::{
    schema::{Field, FieldType, Model},
    stmt::{Direction, Expr, Select, TableRef, Type},
    Result,
};

/// Alias of the filtered, paginated rows that counts and aggregates read.
const AGG: &str = "agg";

impl Lower<'_> {
    /// Counts the rows `args` selects. `None` counts every row, a field
    /// counts its non-null values. Columns are keyed `_all` or by field name.
    pub(crate) fn count(&mut self, model: &Model, args: &ReadArgs, fields: &[Option<String>]) -> Result<Query> {
        let (mut inner, alias) = self.filtered(model, args)?;
        for name in fields.iter().flatten() {
            inner.column(self.column(model, &alias, name)?, name.clone());
        }

        let mut select = Select::from_table(TableRef::subquery(inner, AGG));
        let mut columns = vec![];
        for field in fields {
            let (expr, key) = match field {
                None => (Expr::count_star(), "_all".to_string()),
                Some(name) => (Expr::count(Expr::column(AGG, name)), name.clone()),
            };
            select.column(expr, key.clone());
            columns.push(Column { key, ty: Type::I64 });
        }

        Ok(Query {
            select,
            columns,
            in_memory: InMemory::default(),
        })
    }

    /// One row of aggregates over the rows `args` selects, keyed by
    /// `AggregateItem::alias`.
    pub(crate) fn aggregate(&mut self, model: &Model, args: &ReadArgs, items: &[AggregateItem]) -> Result<Query> {
        let (mut inner, alias) = self.filtered(model, args)?;
        let mut projected: Vec<&str> = vec![];
        for name in items.iter().filter_map(|item| item.field.as_deref()) {
            if !projected.contains(&name) {
                projected.push(name);
                inner.column(self.column(model, &alias, name)?, name);
            }
        }

        let mut select = Select::from_table(TableRef::subquery(inner, AGG));
        let mut columns = vec![];
        for item in items {
            let field = item.field.as_deref().map(|name| model.require_field(name)).transpose()?;
            let expr = match field {
                Some(field) => aggregate_of(item.func, field, Expr::column(AGG, &field.name)),
                None => Expr::count_star(),
            };
            select.column(expr, item.alias());
            columns.push(Column {
                key: item.alias(),
                ty: item.func.result_type(field).stmt_type(),
            });
        }

        Ok(Query {
            select,
            columns,
            in_memory: InMemory::default(),
        })
    }

    /// Groups the rows matching `args.filter` by `by`, with aggregates per
    /// group.
    pub(crate) fn group_by(
        &mut self,
        model: &Model,
        args: &ReadArgs,
        by: &[String],
        having: Option<&Having>,
        items: &[AggregateItem],
    ) -> Result<Query> {
        let alias = self.alias();
        let mut select = self.select_from(model, &alias);
        select.filter = self.filter_opt(model, &alias, args.filter.as_ref())?;

        let mut columns = vec![];
        for name in by {
            let field = model.require_field(name)?;
            let column = self.column(model, &alias, name)?;
            select.column(column.clone(), name.clone());
            select.group_by.push(column);
            columns.push(Column {
                key: name.clone(),
                ty: field_type(field),
            });
        }

        for item in items {
            let field = item.field.as_deref().map(|name| model.require_field(name)).transpose()?;
            let expr = self.aggregate_expr(model, &alias, item.func, item.field.as_deref())?;
            select.column(expr, item.alias());
            columns.push(Column {
                key: item.alias(),
                ty: item.func.result_type(field).stmt_type(),
            });
        }

        if let Some(having) = having {
            select.having = Some(self.having(model, &alias, having)?);
        }

        // Groups have no id; paginate in `by` order.
        let mut order = args.order_by.clone();
        if order.is_empty() && args.is_paginated() {
            order = by
                .iter()
                .map(|name| OrderBy::Field {
                    path: vec![],
                    field: name.clone(),
                    direction: Direction::Asc,
                    nulls: None,
                })
                .collect();
        }
        let reverse = args.take.is_some_and(|take| take < 0);
        if reverse {
            order = order.iter().map(OrderBy::reversed).collect();
        }
        select.order_by = self.order_by(model, &alias, &order)?;
        select.limit = args.take.map(i64::unsigned_abs);
        select.offset = args.skip;

        Ok(Query {
            select,
            columns,
            in_memory: InMemory {
                reverse,
                ..InMemory::default()
            },
        })
    }

    fn having(&mut self, model: &Model, alias: &str, having: &Having) -> Result<Expr> {
        Ok(match having {
            Having::And(items) => {
                let mut operands = vec![];
                for item in items {
                    operands.push(self.having(model, alias, item)?);
                }
                Expr::and_from_vec(operands)
            }
            Having::Or(items) => {
                let mut operands = vec![];
                for item in items {
                    operands.push(self.having(model, alias, item)?);
                }
                Expr::or_from_vec(operands)
            }
            Having::Not(item) => Expr::not(self.having(model, alias, item)?),
            Having::Field { field, func: None, filter } => {
                let field = model.require_field(field)?;
                let column = self.column(model, alias, &field.name)?;
                self.scalar_filter(field, column, filter)?
            }
            Having::Field {
                field,
                func: Some(func),
                filter,
            } => {
                let field = model.require_field(field)?;
                let expr = self.aggregate_expr(model, alias, *func, Some(&field.name))?;
                // Compare against the aggregate's type, not the column's.
                let typed = Field {
                    ty: FieldType::Scalar(func.result_type(Some(field))),
                    array: false,
                    ..field.clone()
                };
                self.scalar_filter(&typed, expr, filter)?
            }
        })
    }
}
