use super::Simplify;
use kiln_core::stmt::{self, Expr};
use std::mem;

impl Simplify {
    pub(super) fn simplify_expr_and(&mut self, expr: &mut stmt::ExprAnd) -> Option<Expr> {
        // Flatten any nested ands
        let operands = mem::take(&mut expr.operands);
        for operand in operands {
            match operand {
                Expr::And(nested) => expr.operands.extend(nested.operands),
                operand => expr.operands.push(operand),
            }
        }

        // `and(..., false, ...) → false`
        if expr.operands.iter().any(Expr::is_false) {
            return Some(false.into());
        }

        // `and(..., true, ...) → and(..., ...)`
        expr.operands.retain(|expr| !expr.is_true());

        // `a and a` → `a`
        let mut seen: Vec<Expr> = Vec::new();
        expr.operands.retain(|operand| {
            if seen.contains(operand) {
                false
            } else {
                seen.push(operand.clone());
                true
            }
        });

        match expr.operands.len() {
            0 => Some(true.into()),
            1 => expr.operands.pop(),
            _ => None,
        }
    }
}
