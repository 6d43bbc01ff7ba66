use super::{Dialect, StringMatch};

use kiln_core::{
    schema::{Field, ScalarType},
    stmt::{BinaryOp, Expr, LikeOp, Value},
};

#[derive(Debug)]
pub(crate) struct PostgreSQL;

impl Dialect for PostgreSQL {
    fn string_match(&self, expr: Expr, kind: StringMatch, needle: &str, insensitive: bool) -> Expr {
        let op = if insensitive { LikeOp::ILike } else { LikeOp::Like };
        Expr::like(op, expr, super::like_pattern(kind, needle), Some('\\'))
    }

    fn insensitive_eq(&self, lhs: Expr, rhs: Value) -> Expr {
        match rhs {
            Value::String(text) => self.string_match(lhs, StringMatch::Equals, &text, true),
            rhs => Expr::eq(lhs, rhs),
        }
    }

    fn array_has(&self, column: Expr, value: Value, _alias: &str) -> Expr {
        Expr::eq(value, Expr::call("ANY", vec![column]))
    }

    fn array_has_every(&self, column: Expr, values: Vec<Value>, _alias: &str) -> Expr {
        Expr::binary_op(column, BinaryOp::ArrayContains, Value::List(values))
    }

    fn array_has_some(&self, column: Expr, values: Vec<Value>, _alias: &str) -> Expr {
        Expr::binary_op(column, BinaryOp::ArrayOverlaps, Value::List(values))
    }

    fn array_is_empty(&self, column: Expr) -> Expr {
        let length = Expr::call("cardinality", vec![column]);
        Expr::eq(Expr::coalesce(vec![length, Expr::value(0i64)]), Expr::value(0i64))
    }

    fn array_push(&self, column: Expr, values: Vec<Value>) -> Expr {
        Expr::call("array_cat", vec![column, Expr::Value(Value::List(values))])
    }

    fn json_field(&self, expr: Expr, field: &Field) -> Expr {
        match field.ty.scalar() {
            Some(ScalarType::Bytes) => Expr::call("encode", vec![expr, Expr::value("hex")]),
            _ => expr,
        }
    }
}
