use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInList {
    pub negated: bool,
    pub expr: Box<Expr>,
    pub list: Vec<Expr>,
}

impl Expr {
    pub fn in_list(lhs: impl Into<Self>, list: Vec<Expr>) -> Self {
        ExprInList {
            negated: false,
            expr: Box::new(lhs.into()),
            list,
        }
        .into()
    }

    pub fn not_in_list(lhs: impl Into<Self>, list: Vec<Expr>) -> Self {
        ExprInList {
            negated: true,
            expr: Box::new(lhs.into()),
            list,
        }
        .into()
    }
}

impl From<ExprInList> for Expr {
    fn from(value: ExprInList) -> Self {
        Self::InList(value)
    }
}
