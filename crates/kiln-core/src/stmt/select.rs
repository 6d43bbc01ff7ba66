use super::*;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: Option<Distinct>,

    /// The projection. Empty selects `1`.
    pub columns: Vec<SelectItem>,

    pub from: Option<TableRef>,

    pub joins: Vec<Join>,

    pub filter: Option<Expr>,

    pub group_by: Vec<Expr>,

    pub having: Option<Expr>,

    pub order_by: Vec<OrderByExpr>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Distinct {
    All,

    /// `DISTINCT ON (...)`
    On(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Select {
    pub fn from_table(table: TableRef) -> Self {
        Select {
            from: Some(table),
            ..Default::default()
        }
    }

    pub fn column(&mut self, expr: impl Into<Expr>, alias: impl Into<String>) {
        self.columns.push(SelectItem::aliased(expr, alias));
    }

    /// ANDs `expr` into the existing filter.
    pub fn and_filter(&mut self, expr: impl Into<Expr>) {
        self.filter = Some(match self.filter.take() {
            Some(filter) => Expr::and(filter, expr),
            None => expr.into(),
        });
    }
}

impl SelectItem {
    pub fn new(expr: impl Into<Expr>) -> Self {
        SelectItem {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<Expr>, alias: impl Into<String>) -> Self {
        SelectItem {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}
