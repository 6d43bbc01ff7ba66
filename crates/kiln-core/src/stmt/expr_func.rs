use super::*;

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprFunc {
    /// `COUNT(*)` or `COUNT([DISTINCT] expr)`
    Count(FuncCount),

    Aggregate(FuncAggregate),

    Lower(Box<Expr>),

    Coalesce(Vec<Expr>),

    /// Builds a JSON object from key/value pairs
    JsonObject(Vec<(String, Expr)>),

    /// Aggregates JSON values into a JSON array
    JsonArrayAgg(Box<Expr>),

    /// An empty JSON array literal
    JsonEmptyArray,

    /// Marks an expression as already holding JSON so that it embeds as a
    /// nested value rather than a string.
    AsJson(Box<Expr>),

    /// A backend-specific function, named by the dialect that built it
    Call(FuncCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCount {
    /// `None` counts rows.
    pub arg: Option<Box<Expr>>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncAggregate {
    pub op: AggregateOp,
    pub arg: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub name: Cow<'static, str>,
    pub args: Vec<Expr>,
}

impl AggregateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
        }
    }

    /// Name used for the operator in descriptors and result objects.
    pub fn key(self) -> &'static str {
        match self {
            AggregateOp::Sum => "_sum",
            AggregateOp::Avg => "_avg",
            AggregateOp::Min => "_min",
            AggregateOp::Max => "_max",
        }
    }
}

impl Expr {
    pub fn count_star() -> Self {
        ExprFunc::Count(FuncCount {
            arg: None,
            distinct: false,
        })
        .into()
    }

    pub fn count(arg: impl Into<Self>) -> Self {
        ExprFunc::Count(FuncCount {
            arg: Some(Box::new(arg.into())),
            distinct: false,
        })
        .into()
    }

    pub fn aggregate(op: AggregateOp, arg: impl Into<Self>) -> Self {
        ExprFunc::Aggregate(FuncAggregate {
            op,
            arg: Box::new(arg.into()),
        })
        .into()
    }

    pub fn lower(expr: impl Into<Self>) -> Self {
        ExprFunc::Lower(Box::new(expr.into())).into()
    }

    pub fn coalesce(exprs: Vec<Expr>) -> Self {
        ExprFunc::Coalesce(exprs).into()
    }

    pub fn json_object(entries: Vec<(String, Expr)>) -> Self {
        ExprFunc::JsonObject(entries).into()
    }

    pub fn json_array_agg(expr: impl Into<Self>) -> Self {
        ExprFunc::JsonArrayAgg(Box::new(expr.into())).into()
    }

    pub fn json_empty_array() -> Self {
        ExprFunc::JsonEmptyArray.into()
    }

    pub fn as_json(expr: impl Into<Self>) -> Self {
        ExprFunc::AsJson(Box::new(expr.into())).into()
    }

    pub fn call(name: impl Into<Cow<'static, str>>, args: Vec<Expr>) -> Self {
        ExprFunc::Call(FuncCall {
            name: name.into(),
            args,
        })
        .into()
    }
}

impl From<ExprFunc> for Expr {
    fn from(value: ExprFunc) -> Self {
        Self::Func(value)
    }
}
