mod expr_or;

use kiln_core::stmt::Expr;

/// A column reference standing in for an arbitrary operand.
fn col(name: &str) -> Expr {
    Expr::column("t0", name)
}
