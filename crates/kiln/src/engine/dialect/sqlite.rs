use super::{wrap, Dialect, StringMatch};

use kiln_core::{
    schema::{Field, ScalarType},
    stmt::{Expr, LikeOp, Select, TableRef, Value},
};

#[derive(Debug)]
pub(crate) struct Sqlite;

impl Sqlite {
    /// `SELECT 1 FROM json_each(column) AS alias WHERE pred(alias.value)`
    fn each(column: Expr, alias: &str, pred: impl FnOnce(Expr) -> Expr) -> Select {
        let mut select = Select::from_table(TableRef::JsonEach {
            expr: Box::new(column),
            alias: alias.to_string(),
        });
        select.filter = Some(pred(Expr::column(alias, "value")));
        select
    }
}

impl Dialect for Sqlite {
    // LIKE ignores ASCII case in SQLite, so case-sensitive matches use GLOB.
    fn string_match(&self, expr: Expr, kind: StringMatch, needle: &str, insensitive: bool) -> Expr {
        if insensitive {
            let pattern = super::like_pattern(kind, needle);
            return Expr::like(LikeOp::Like, Expr::lower(expr), Expr::lower(Expr::value(pattern)), Some('\\'));
        }

        let mut escaped = String::with_capacity(needle.len());
        for c in needle.chars() {
            match c {
                '*' | '?' | '[' => {
                    escaped.push('[');
                    escaped.push(c);
                    escaped.push(']');
                }
                c => escaped.push(c),
            }
        }
        Expr::like(LikeOp::Glob, expr, wrap(kind, &escaped, '*'), None)
    }

    fn array_has(&self, column: Expr, value: Value, alias: &str) -> Expr {
        Expr::exists(Sqlite::each(column, alias, |item| Expr::eq(item, value)))
    }

    fn array_has_every(&self, column: Expr, values: Vec<Value>, alias: &str) -> Expr {
        let checks = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| self.array_has(column.clone(), value, &format!("{alias}_{i}")))
            .collect();
        Expr::and_from_vec(checks)
    }

    fn array_has_some(&self, column: Expr, values: Vec<Value>, alias: &str) -> Expr {
        let list = values.into_iter().map(Expr::Value).collect();
        Expr::exists(Sqlite::each(column, alias, |item| Expr::in_list(item, list)))
    }

    fn array_is_empty(&self, column: Expr) -> Expr {
        let length = Expr::call("json_array_length", vec![column]);
        Expr::eq(Expr::coalesce(vec![length, Expr::value(0i64)]), Expr::value(0i64))
    }

    fn array_push(&self, column: Expr, values: Vec<Value>) -> Expr {
        let mut args = vec![Expr::coalesce(vec![column, Expr::json_empty_array()])];
        for value in values {
            args.push(Expr::value("$[#]"));
            args.push(Expr::Value(value));
        }
        Expr::call("json_insert", args)
    }

    fn json_field(&self, expr: Expr, field: &Field) -> Expr {
        match field.ty.scalar() {
            Some(ScalarType::Bytes) => Expr::call("hex", vec![expr]),
            Some(ScalarType::Json) => Expr::as_json(expr),
            _ if field.array => Expr::as_json(expr),
            _ => expr,
        }
    }
}
