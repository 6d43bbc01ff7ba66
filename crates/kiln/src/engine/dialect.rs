//! Backend-specific pieces of SQL the lowering cannot express portably.

mod mysql;
mod postgresql;
mod sqlite;

use kiln_core::{
    driver::Provider,
    schema::Field,
    stmt::{Expr, LikeOp, Value},
};

use std::fmt;

/// The kind of string match a filter asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringMatch {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
}

pub(crate) trait Dialect: Send + Sync + fmt::Debug {
    /// `expr` matches `needle` as a substring, prefix, suffix or whole.
    fn string_match(&self, expr: Expr, kind: StringMatch, needle: &str, insensitive: bool) -> Expr {
        let pattern = like_pattern(kind, needle);
        if insensitive {
            Expr::like(LikeOp::Like, Expr::lower(expr), Expr::lower(Expr::value(pattern)), Some('\\'))
        } else {
            Expr::like(LikeOp::Like, expr, pattern, Some('\\'))
        }
    }

    /// Case-insensitive equality.
    fn insensitive_eq(&self, lhs: Expr, rhs: Value) -> Expr {
        Expr::eq(Expr::lower(lhs), Expr::lower(Expr::Value(rhs)))
    }

    /// Whole-list equality of a list column.
    fn array_equals(&self, column: Expr, value: Value) -> Expr {
        Expr::eq(column, value)
    }

    /// The list column contains `value`. `alias` names any row source the
    /// dialect introduces.
    fn array_has(&self, column: Expr, value: Value, alias: &str) -> Expr;

    fn array_has_every(&self, column: Expr, values: Vec<Value>, alias: &str) -> Expr;

    fn array_has_some(&self, column: Expr, values: Vec<Value>, alias: &str) -> Expr;

    /// True when the list column is empty or null.
    fn array_is_empty(&self, column: Expr) -> Expr;

    /// Appends `values` to the list column.
    fn array_push(&self, column: Expr, values: Vec<Value>) -> Expr;

    /// The representation of a column embedded in a JSON object.
    fn json_field(&self, expr: Expr, field: &Field) -> Expr;

    /// Reads the id generated by the last insert, on backends without
    /// `RETURNING`.
    fn last_insert_id(&self) -> Option<Expr> {
        None
    }
}

pub(crate) fn for_provider(provider: Provider) -> &'static dyn Dialect {
    match provider {
        Provider::Sqlite => &sqlite::Sqlite,
        Provider::Postgresql => &postgresql::PostgreSQL,
        Provider::Mysql => &mysql::MySql,
    }
}

/// Escapes `%`, `_` and `\` and wraps the needle per `kind`.
pub(crate) fn like_pattern(kind: StringMatch, needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    wrap(kind, &escaped, '%')
}

fn wrap(kind: StringMatch, escaped: &str, wildcard: char) -> String {
    match kind {
        StringMatch::Contains => format!("{wildcard}{escaped}{wildcard}"),
        StringMatch::StartsWith => format!("{escaped}{wildcard}"),
        StringMatch::EndsWith => format!("{wildcard}{escaped}"),
        StringMatch::Equals => escaped.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern(StringMatch::Contains, "50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(StringMatch::StartsWith, "a\\b"), "a\\\\b%");
        assert_eq!(like_pattern(StringMatch::EndsWith, "x"), "%x");
    }
}
