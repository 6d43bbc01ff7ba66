use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ExprExists {
    pub negated: bool,
    pub subquery: Box<Select>,
}

impl Expr {
    pub fn exists(subquery: Select) -> Self {
        ExprExists {
            negated: false,
            subquery: Box::new(subquery),
        }
        .into()
    }

    pub fn not_exists(subquery: Select) -> Self {
        ExprExists {
            negated: true,
            subquery: Box::new(subquery),
        }
        .into()
    }
}

impl From<ExprExists> for Expr {
    fn from(value: ExprExists) -> Self {
        Self::Exists(value)
    }
}
