use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// AND a set of expressions
    And(ExprAnd),

    /// OR a set of expressions
    Or(ExprOr),

    Not(ExprNot),

    /// Binary expression
    BinaryOp(ExprBinaryOp),

    /// Reference a column, optionally qualified by a table alias
    Column(ExprColumn),

    /// A literal or bound value
    Value(Value),

    /// The `DEFAULT` keyword inside an INSERT's VALUES list
    Default,

    /// Function call
    Func(ExprFunc),

    InList(ExprInList),

    InSubquery(ExprInSubquery),

    Exists(ExprExists),

    IsNull(ExprIsNull),

    Like(ExprLike),

    /// A tuple `(a, b, ...)`
    Record(Vec<Expr>),

    /// A scalar subquery
    Subquery(Box<Select>),

    Cast(ExprCast),
}

impl Expr {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    pub fn is_value_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// Returns true if the expression is the `true` literal
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Value(Value::Bool(true)))
    }

    /// Returns true if the expression is the `false` literal
    pub fn is_false(&self) -> bool {
        matches!(self, Self::Value(Value::Bool(false)))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn record(items: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        Self::Record(items.into_iter().map(Into::into).collect())
    }

    pub fn subquery(select: Select) -> Self {
        Self::Subquery(Box::new(select))
    }

    /// Returns the expression if it is a single-item record, unwrapped.
    pub fn simplify_record(self) -> Self {
        match self {
            Self::Record(mut items) if items.len() == 1 => items.remove(0),
            expr => expr,
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Value(Value::I64(value))
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Select> for Expr {
    fn from(value: Select) -> Self {
        Self::subquery(value)
    }
}
