use super::{Dialect, StringMatch};

use kiln_core::{
    schema::{Field, ScalarType},
    stmt::{Expr, LikeOp, Type, Value},
};

#[derive(Debug)]
pub(crate) struct MySql;

fn json_array(values: Vec<Value>) -> Expr {
    Expr::call("JSON_ARRAY", values.into_iter().map(Expr::Value).collect())
}

impl Dialect for MySql {
    // The default collation ignores case; binary comparison restores it.
    fn string_match(&self, expr: Expr, kind: StringMatch, needle: &str, insensitive: bool) -> Expr {
        let pattern = super::like_pattern(kind, needle);
        if insensitive {
            Expr::like(LikeOp::Like, Expr::lower(expr), Expr::lower(Expr::value(pattern)), Some('\\'))
        } else {
            Expr::like(LikeOp::Like, Expr::cast(expr, Type::Bytes), pattern, Some('\\'))
        }
    }

    fn array_equals(&self, column: Expr, value: Value) -> Expr {
        match value {
            Value::Null => Expr::is_null(column),
            value => Expr::eq(column, Expr::cast(Value::String(value.to_json().to_string()), Type::Json)),
        }
    }

    fn array_has(&self, column: Expr, value: Value, _alias: &str) -> Expr {
        Expr::call("JSON_CONTAINS", vec![column, json_array(vec![value])])
    }

    fn array_has_every(&self, column: Expr, values: Vec<Value>, _alias: &str) -> Expr {
        Expr::call("JSON_CONTAINS", vec![column, json_array(values)])
    }

    fn array_has_some(&self, column: Expr, values: Vec<Value>, _alias: &str) -> Expr {
        Expr::call("JSON_OVERLAPS", vec![column, json_array(values)])
    }

    fn array_is_empty(&self, column: Expr) -> Expr {
        let length = Expr::call("JSON_LENGTH", vec![column]);
        Expr::eq(Expr::coalesce(vec![length, Expr::value(0i64)]), Expr::value(0i64))
    }

    fn array_push(&self, column: Expr, values: Vec<Value>) -> Expr {
        let mut args = vec![Expr::coalesce(vec![column, Expr::json_empty_array()])];
        for value in values {
            args.push(Expr::value("$"));
            args.push(Expr::Value(value));
        }
        Expr::call("JSON_ARRAY_APPEND", args)
    }

    fn json_field(&self, expr: Expr, field: &Field) -> Expr {
        match field.ty.scalar() {
            Some(ScalarType::Bytes) => Expr::call("HEX", vec![expr]),
            _ => expr,
        }
    }

    fn last_insert_id(&self) -> Option<Expr> {
        Some(Expr::call("LAST_INSERT_ID", vec![]))
    }
}
