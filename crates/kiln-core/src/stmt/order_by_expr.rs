use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: Direction,
    pub nulls: Option<NullsOrder>,
}

impl OrderByExpr {
    pub fn new(expr: impl Into<Expr>, direction: Direction) -> Self {
        OrderByExpr {
            expr: expr.into(),
            direction,
            nulls: None,
        }
    }
}
