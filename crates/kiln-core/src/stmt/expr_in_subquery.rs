use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInSubquery {
    pub expr: Box<Expr>,
    pub query: Box<Select>,
}

impl Expr {
    pub fn in_subquery(lhs: impl Into<Self>, query: Select) -> Self {
        ExprInSubquery {
            expr: Box::new(lhs.into()),
            query: Box::new(query),
        }
        .into()
    }
}

impl From<ExprInSubquery> for Expr {
    fn from(value: ExprInSubquery) -> Self {
        Self::InSubquery(value)
    }
}
