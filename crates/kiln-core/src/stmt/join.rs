use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl Join {
    pub fn inner(table: TableRef, on: Expr) -> Self {
        Join {
            kind: JoinKind::Inner,
            table,
            on,
        }
    }

    pub fn left(table: TableRef, on: Expr) -> Self {
        Join {
            kind: JoinKind::Left,
            table,
            on,
        }
    }
}
