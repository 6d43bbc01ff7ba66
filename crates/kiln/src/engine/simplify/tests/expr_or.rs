use super::col;
use crate::engine::simplify::Simplify;
use kiln_core::stmt::{Expr, ExprOr};

#[test]
fn flatten_and_drop_false() {
    // `or(a, or(false, b)) → or(a, b)`
    let mut expr = ExprOr {
        operands: vec![
            col("a"),
            Expr::Or(ExprOr {
                operands: vec![false.into(), col("b")],
            }),
        ],
    };
    assert!(Simplify::new().simplify_expr_or(&mut expr).is_none());
    assert_eq!(expr.operands, vec![col("a"), col("b")]);
}

#[test]
fn true_short_circuits() {
    let mut expr = ExprOr {
        operands: vec![col("a"), true.into()],
    };
    assert_eq!(Simplify::new().simplify_expr_or(&mut expr), Some(true.into()));
}

#[test]
fn empty_is_false() {
    let mut expr = ExprOr {
        operands: vec![false.into()],
    };
    assert_eq!(Simplify::new().simplify_expr_or(&mut expr), Some(false.into()));
}
