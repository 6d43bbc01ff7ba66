use super::Simplify;
use kiln_core::stmt::{self, Expr};

impl Simplify {
    pub(super) fn simplify_expr_not(&mut self, expr: &mut stmt::ExprNot) -> Option<Expr> {
        match &mut *expr.expr {
            // `not(true) → false`, `not(false) → true`
            Expr::Value(stmt::Value::Bool(value)) => Some((!*value).into()),

            // `not(not(a)) → a`
            Expr::Not(inner) => Some(std::mem::take(&mut *inner.expr)),

            // `not(a is null) → a is not null`
            Expr::IsNull(is_null) => {
                is_null.negate = !is_null.negate;
                Some(std::mem::take(&mut *expr.expr))
            }

            Expr::Exists(exists) => {
                exists.negated = !exists.negated;
                Some(std::mem::take(&mut *expr.expr))
            }
            _ => None,
        }
    }
}
