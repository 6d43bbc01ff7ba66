use super::Lower;
use crate::engine::args::{AggregateFunc, Filter, OrderBy};

use kiln_core::{
    schema::{Field, Model},
    stmt::{Direction, Expr, Join, OrderByExpr, Select},
    Error, Result,
};

/// The ordering a read runs with: reversed for a negative `take`, and by id
/// when paginating without an explicit order.
pub(crate) fn effective(model: &Model, order_by: &[OrderBy], take: Option<i64>, paginated: bool) -> Vec<OrderBy> {
    let mut order = order_by.to_vec();
    if order.is_empty() && paginated {
        order = model
            .id_fields
            .iter()
            .map(|id| OrderBy::Field {
                path: vec![],
                field: id.clone(),
                direction: Direction::Asc,
                nulls: None,
            })
            .collect();
    }
    if take.is_some_and(|take| take < 0) {
        order = order.iter().map(OrderBy::reversed).collect();
    }
    order
}

impl Lower<'_> {
    pub(crate) fn order_by(
        &mut self,
        model: &Model,
        alias: &str,
        order: &[OrderBy],
    ) -> Result<Vec<OrderByExpr>> {
        let mut out = vec![];
        for item in order {
            let (expr, nulls) = match item {
                OrderBy::Field { path, field, nulls, .. } => {
                    let expr = self.along_path(model, alias, path, |this, model, alias| {
                        this.column(model, alias, field)
                    })?;
                    (expr, *nulls)
                }
                OrderBy::RelationCount { path, field, .. } => {
                    let expr = self.along_path(model, alias, path, |this, model, alias| {
                        let field = model.require_field(field)?;
                        let target = this.schema.relation_target(field)?;
                        this.related_count(model, alias, field, target, &Filter::And(vec![]), false)
                    })?;
                    (expr, None)
                }
                OrderBy::Aggregate { func, field, .. } => {
                    (self.aggregate_expr(model, alias, *func, field.as_deref())?, None)
                }
            };
            out.push(OrderByExpr {
                expr,
                direction: item.direction(),
                nulls,
            });
        }
        Ok(out)
    }

    /// Evaluates `leaf` on the row reached by following the to-one `path`,
    /// as a scalar subquery when the path is not empty.
    fn along_path(
        &mut self,
        model: &Model,
        alias: &str,
        path: &[String],
        leaf: impl FnOnce(&mut Self, &Model, &str) -> Result<Expr>,
    ) -> Result<Expr> {
        if path.is_empty() {
            return leaf(self, model, alias);
        }

        let schema = self.schema;
        let mut current_model = model;
        let mut current_alias = alias.to_string();
        let mut select: Option<Select> = None;

        for segment in path {
            let field = current_model.require_field(segment)?;
            let target = schema.relation_target(field)?;
            let child = self.alias();
            let link = self.link(current_model, &current_alias, field, target, &child)?;
            match &mut select {
                None => {
                    let mut first = self.select_from(target, &child);
                    first.filter = Some(link);
                    select = Some(first);
                }
                Some(select) => {
                    let (table, joins) = self.source(target, &child);
                    select.joins.push(Join::left(table, link));
                    select.joins.extend(joins);
                }
            }
            current_model = target;
            current_alias = child;
        }

        let Some(mut select) = select else {
            return leaf(self, model, alias);
        };
        let expr = leaf(self, current_model, &current_alias)?;
        select.column(expr, "v");
        select.limit = Some(1);
        Ok(Expr::subquery(select))
    }

    /// An aggregate over the rows of `model`, cast to the type the result is
    /// reported as.
    pub(crate) fn aggregate_expr(
        &mut self,
        model: &Model,
        alias: &str,
        func: AggregateFunc,
        field: Option<&str>,
    ) -> Result<Expr> {
        let Some(name) = field else {
            return match func {
                AggregateFunc::Count => Ok(Expr::count_star()),
                _ => Err(Error::invalid_argument(format!("`{}` needs a field", func.key()))),
            };
        };
        let field = model.require_field(name)?;
        let column = self.column(model, alias, name)?;
        Ok(aggregate_of(func, field, column))
    }
}

/// Applies `func` to `arg`, normalizing the result type across backends.
pub(crate) fn aggregate_of(func: AggregateFunc, field: &Field, arg: Expr) -> Expr {
    let Some(op) = func.op() else {
        return Expr::count(arg);
    };
    let expr = Expr::aggregate(op, arg);
    match func {
        AggregateFunc::Sum | AggregateFunc::Avg => Expr::cast(expr, func.result_type(Some(field)).stmt_type()),
        _ => expr,
    }
}
