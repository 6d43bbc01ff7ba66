use super::Simplify;
use kiln_core::stmt::{self, Expr};

impl Simplify {
    pub(super) fn simplify_expr_in_list(&mut self, expr: &mut stmt::ExprInList) -> Option<Expr> {
        // `x in ()` → `false`, `x not in ()` → `true`
        if expr.list.is_empty() {
            return Some(expr.negated.into());
        }

        // Deduplicate literal lists: `x in (1, 1, 2)` → `x in (1, 2)`
        let mut seen: Vec<Expr> = Vec::with_capacity(expr.list.len());
        expr.list.retain(|item| {
            if seen.contains(item) {
                false
            } else {
                seen.push(item.clone());
                true
            }
        });

        // Single-item lists become comparisons; records keep the expanded
        // form the serializer produces.
        if expr.list.len() == 1 && !matches!(*expr.expr, Expr::Record(_)) {
            let lhs = std::mem::take(&mut *expr.expr);
            let rhs = expr.list.pop()?;
            return Some(if expr.negated {
                Expr::ne(lhs, rhs)
            } else {
                Expr::eq(lhs, rhs)
            });
        }

        None
    }
}
