use super::*;

/// Pattern match of a string expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprLike {
    pub op: LikeOp,
    pub negated: bool,
    pub expr: Box<Expr>,
    pub pattern: Box<Expr>,

    /// Escape character used by the pattern, `LIKE` / `ILIKE` only.
    pub escape: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOp {
    Like,

    /// Case-insensitive `LIKE`
    ILike,

    /// Case-sensitive glob matching (`*`, `?`)
    Glob,
}

impl Expr {
    pub fn like(op: LikeOp, expr: impl Into<Self>, pattern: impl Into<Self>, escape: Option<char>) -> Self {
        ExprLike {
            op,
            negated: false,
            expr: Box::new(expr.into()),
            pattern: Box::new(pattern.into()),
            escape,
        }
        .into()
    }
}

impl From<ExprLike> for Expr {
    fn from(value: ExprLike) -> Self {
        Self::Like(value)
    }
}
