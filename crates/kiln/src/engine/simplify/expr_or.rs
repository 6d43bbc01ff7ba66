use super::Simplify;
use kiln_core::stmt::{self, Expr};
use std::mem;

impl Simplify {
    pub(super) fn simplify_expr_or(&mut self, expr: &mut stmt::ExprOr) -> Option<Expr> {
        let operands = mem::take(&mut expr.operands);
        for operand in operands {
            match operand {
                Expr::Or(nested) => expr.operands.extend(nested.operands),
                operand => expr.operands.push(operand),
            }
        }

        // `or(..., true, ...) → true`
        if expr.operands.iter().any(Expr::is_true) {
            return Some(true.into());
        }

        expr.operands.retain(|expr| !expr.is_false());

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
            0 => Some(false.into()),
            1 => expr.operands.pop(),
            _ => None,
        }
    }
}
