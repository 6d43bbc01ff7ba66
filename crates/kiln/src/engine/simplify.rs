//! Folds constants out of lowered statements before they are serialized.
//!
//! Relation filters and defaulted arguments leave `true`, `false` and
//! single-item nodes behind; this pass cleans them up bottom-up.

mod expr_and;
mod expr_in_list;
mod expr_not;
mod expr_or;

use kiln_core::stmt::{self, Expr, ExprFunc, Select, Statement, TableRef};

#[derive(Debug, Default)]
pub(crate) struct Simplify;

impl Simplify {
    pub(crate) fn new() -> Simplify {
        Simplify
    }

    pub(crate) fn visit_stmt_mut(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Select(select) => self.visit_select_mut(select),
            Statement::Insert(insert) => {
                for row in &mut insert.rows {
                    for expr in row {
                        self.visit_expr_mut(expr);
                    }
                }
            }
            Statement::Update(update) => {
                for assignment in &mut update.assignments {
                    self.visit_expr_mut(&mut assignment.value);
                }
                self.visit_filter_mut(&mut update.filter);
            }
            Statement::Delete(delete) => self.visit_filter_mut(&mut delete.filter),
        }
    }

    pub(crate) fn visit_select_mut(&mut self, select: &mut Select) {
        for column in &mut select.columns {
            self.visit_expr_mut(&mut column.expr);
        }
        if let Some(from) = &mut select.from {
            self.visit_table_ref_mut(from);
        }
        for join in &mut select.joins {
            self.visit_table_ref_mut(&mut join.table);
            self.visit_expr_mut(&mut join.on);
        }
        self.visit_filter_mut(&mut select.filter);
        for expr in &mut select.group_by {
            self.visit_expr_mut(expr);
        }
        self.visit_filter_mut(&mut select.having);
        for order_by in &mut select.order_by {
            self.visit_expr_mut(&mut order_by.expr);
        }
    }

    fn visit_table_ref_mut(&mut self, table: &mut TableRef) {
        match table {
            TableRef::Table { .. } => {}
            TableRef::Subquery { select, .. } => self.visit_select_mut(select),
            TableRef::JsonEach { expr, .. } => self.visit_expr_mut(expr),
        }
    }

    /// A filter folded to `true` is dropped.
    fn visit_filter_mut(&mut self, filter: &mut Option<Expr>) {
        if let Some(expr) = filter {
            self.visit_expr_mut(expr);
            if expr.is_true() {
                *filter = None;
            }
        }
    }

    pub(crate) fn visit_expr_mut(&mut self, expr: &mut Expr) {
        // Children first.
        match expr {
            Expr::And(and) => and.operands.iter_mut().for_each(|e| self.visit_expr_mut(e)),
            Expr::Or(or) => or.operands.iter_mut().for_each(|e| self.visit_expr_mut(e)),
            Expr::Not(not) => self.visit_expr_mut(&mut not.expr),
            Expr::BinaryOp(op) => {
                self.visit_expr_mut(&mut op.lhs);
                self.visit_expr_mut(&mut op.rhs);
            }
            Expr::Func(func) => self.visit_func_mut(func),
            Expr::InList(in_list) => {
                self.visit_expr_mut(&mut in_list.expr);
                in_list.list.iter_mut().for_each(|e| self.visit_expr_mut(e));
            }
            Expr::InSubquery(in_subquery) => {
                self.visit_expr_mut(&mut in_subquery.expr);
                self.visit_select_mut(&mut in_subquery.query);
            }
            Expr::Exists(exists) => self.visit_select_mut(&mut exists.subquery),
            Expr::IsNull(is_null) => self.visit_expr_mut(&mut is_null.expr),
            Expr::Like(like) => {
                self.visit_expr_mut(&mut like.expr);
                self.visit_expr_mut(&mut like.pattern);
            }
            Expr::Record(items) => items.iter_mut().for_each(|e| self.visit_expr_mut(e)),
            Expr::Subquery(select) => self.visit_select_mut(select),
            Expr::Cast(cast) => self.visit_expr_mut(&mut cast.expr),
            Expr::Column(_) | Expr::Value(_) | Expr::Default => {}
        }

        let simplified = match expr {
            Expr::And(and) => self.simplify_expr_and(and),
            Expr::Or(or) => self.simplify_expr_or(or),
            Expr::Not(not) => self.simplify_expr_not(not),
            Expr::InList(in_list) => self.simplify_expr_in_list(in_list),
            _ => None,
        };

        if let Some(simplified) = simplified {
            *expr = simplified;
        }
    }

    fn visit_func_mut(&mut self, func: &mut ExprFunc) {
        match func {
            ExprFunc::Count(stmt::FuncCount { arg: Some(arg), .. }) => self.visit_expr_mut(arg),
            ExprFunc::Count(_) | ExprFunc::JsonEmptyArray => {}
            ExprFunc::Aggregate(aggregate) => self.visit_expr_mut(&mut aggregate.arg),
            ExprFunc::Lower(expr) | ExprFunc::JsonArrayAgg(expr) | ExprFunc::AsJson(expr) => {
                self.visit_expr_mut(expr)
            }
            ExprFunc::Coalesce(exprs) => exprs.iter_mut().for_each(|e| self.visit_expr_mut(e)),
            ExprFunc::JsonObject(entries) => {
                entries.iter_mut().for_each(|(_, e)| self.visit_expr_mut(e))
            }
            ExprFunc::Call(call) => call.args.iter_mut().for_each(|e| self.visit_expr_mut(e)),
        }
    }
}

#[cfg(test)]
mod tests;
