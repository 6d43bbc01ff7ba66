use super::{ident::Literal, ty::cast_name, Comma, Delimited, Ident, Params, ToSql};

use kiln_core::stmt::{self, Expr, ExprFunc};

/// Parenthesizes operands that would otherwise bind incorrectly.
struct Operand<'a>(&'a Expr);

impl ToSql for Operand<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self.0 {
            Expr::BinaryOp(_) | Expr::Not(_) => {
                fmt!(f, "(" self.0 ")")
            }
            expr => expr.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Expr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use stmt::Expr::*;

        match self {
            And(expr) if expr.operands.is_empty() => stmt::Value::Bool(true).to_sql(f),
            And(expr) => {
                fmt!(f, "(" Delimited(expr.operands.iter(), " AND ") ")");
            }
            Or(expr) if expr.operands.is_empty() => stmt::Value::Bool(false).to_sql(f),
            Or(expr) => {
                fmt!(f, "(" Delimited(expr.operands.iter(), " OR ") ")");
            }
            Not(expr) => {
                fmt!(f, "NOT " Operand(&expr.expr));
            }
            BinaryOp(expr) => {
                fmt!(f, Operand(&expr.lhs) " " expr.op " " Operand(&expr.rhs));
            }
            Column(column) => {
                if let Some(table) = &column.table {
                    fmt!(f, Ident(table) ".");
                }
                fmt!(f, Ident(&column.name));
            }
            Value(value) => value.to_sql(f),
            Default => f.dst.push_str("DEFAULT"),
            Func(func) => func.to_sql(f),
            InList(expr) if expr.list.is_empty() => {
                // `x IN ()` is not valid SQL
                let literal = if expr.negated { "1 = 1" } else { "1 = 0" };
                f.dst.push_str(literal);
            }
            InList(expr) => match &*expr.expr {
                Record(fields) => {
                    // Row values in IN lists are not portable; expand to ORs.
                    let alternatives = expr.list.iter().map(|item| RecordEq(fields, item));
                    if expr.negated {
                        fmt!(f, "NOT ");
                    }
                    fmt!(f, "(" Delimited(alternatives, " OR ") ")");
                }
                lhs => {
                    let op = if expr.negated { " NOT IN (" } else { " IN (" };
                    fmt!(f, Operand(lhs) op Comma(expr.list.iter()) ")");
                }
            },
            InSubquery(expr) => {
                let query: &stmt::Select = &expr.query;
                fmt!(f, Operand(&expr.expr) " IN (" query ")");
            }
            Exists(expr) => {
                let op = if expr.negated { "NOT EXISTS (" } else { "EXISTS (" };
                let subquery: &stmt::Select = &expr.subquery;
                fmt!(f, op subquery ")");
            }
            IsNull(expr) => {
                let op = if expr.negate { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, Operand(&expr.expr) op);
            }
            Like(expr) => {
                let op = match (expr.op, expr.negated) {
                    (stmt::LikeOp::Like, false) => " LIKE ",
                    (stmt::LikeOp::Like, true) => " NOT LIKE ",
                    (stmt::LikeOp::ILike, false) => " ILIKE ",
                    (stmt::LikeOp::ILike, true) => " NOT ILIKE ",
                    (stmt::LikeOp::Glob, false) => " GLOB ",
                    (stmt::LikeOp::Glob, true) => " NOT GLOB ",
                };
                fmt!(f, Operand(&expr.expr) op Operand(&expr.pattern));
                if let Some(escape) = expr.escape {
                    fmt!(f, " ESCAPE " Literal(escape.to_string()));
                }
            }
            Record(fields) => {
                fmt!(f, "(" Comma(fields.iter()) ")");
            }
            Subquery(select) => {
                let select: &stmt::Select = select;
                fmt!(f, "(" select ")");
            }
            Cast(expr) => {
                let ty = cast_name(f.serializer, &expr.ty);
                let inner: &Expr = &expr.expr;
                fmt!(f, "CAST(" inner " AS " ty ")");
            }
        }
    }
}

/// `(a = x AND b = y)` for one entry of a composite IN list.
struct RecordEq<'a>(&'a [Expr], &'a Expr);

impl ToSql for RecordEq<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self.1 {
            Expr::Record(values) => {
                let pairs = self.0.iter().zip(values).map(|(lhs, rhs)| Eq(lhs, rhs));
                fmt!(f, "(" Delimited(pairs, " AND ") ")");
            }
            Expr::Value(stmt::Value::List(items)) => {
                let pairs = self.0.iter().zip(items).map(|(lhs, value)| EqValue(lhs, value));
                fmt!(f, "(" Delimited(pairs, " AND ") ")");
            }
            other => {
                let pairs = self.0.iter().take(1).map(|lhs| Eq(lhs, other));
                fmt!(f, "(" Delimited(pairs, " AND ") ")");
            }
        }
    }
}

struct Eq<'a>(&'a Expr, &'a Expr);

impl ToSql for Eq<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, self.0 " = " self.1);
    }
}

struct EqValue<'a>(&'a Expr, &'a stmt::Value);

impl ToSql for EqValue<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, self.0 " = " self.1);
    }
}

impl ToSql for stmt::BinaryOp {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.dst.push_str(self.as_str());
    }
}

/// One `'key', value` pair of a JSON object constructor.
struct JsonEntry<'a>(&'a str, &'a Expr);

impl ToSql for JsonEntry<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, Literal(self.0) ", " self.1);
    }
}

/// PostgreSQL caps function arguments at 100, so larger objects are built
/// from chunks concatenated with `||`.
const PG_JSON_OBJECT_PAIRS: usize = 50;

impl ToSql for &ExprFunc {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let serializer = f.serializer;

        match self {
            ExprFunc::Count(count) => match count.arg.as_deref() {
                None => fmt!(f, "COUNT(*)"),
                Some(arg) if count.distinct => fmt!(f, "COUNT(DISTINCT " arg ")"),
                Some(arg) => fmt!(f, "COUNT(" arg ")"),
            },
            ExprFunc::Aggregate(aggregate) => {
                let arg: &Expr = &aggregate.arg;
                fmt!(f, aggregate.op.as_str() "(" arg ")");
            }
            ExprFunc::Lower(expr) => {
                let expr: &Expr = expr;
                fmt!(f, "LOWER(" expr ")");
            }
            ExprFunc::Coalesce(exprs) => {
                fmt!(f, "COALESCE(" Comma(exprs.iter()) ")");
            }
            ExprFunc::JsonObject(entries) => {
                let pairs = || entries.iter().map(|(key, value)| JsonEntry(key, value));
                if serializer.is_postgresql() {
                    if entries.len() <= PG_JSON_OBJECT_PAIRS {
                        fmt!(f, "jsonb_build_object(" Comma(pairs()) ")");
                    } else {
                        let chunks = entries.chunks(PG_JSON_OBJECT_PAIRS).map(JsonChunk);
                        fmt!(f, "(" Delimited(chunks, " || ") ")");
                    }
                } else if serializer.is_mysql() {
                    fmt!(f, "JSON_OBJECT(" Comma(pairs()) ")");
                } else {
                    fmt!(f, "json_object(" Comma(pairs()) ")");
                }
            }
            ExprFunc::JsonArrayAgg(expr) => {
                let name = if serializer.is_postgresql() {
                    "jsonb_agg("
                } else if serializer.is_mysql() {
                    "JSON_ARRAYAGG("
                } else {
                    "json_group_array("
                };
                let expr: &Expr = expr;
                fmt!(f, name expr ")");
            }
            ExprFunc::JsonEmptyArray => {
                let literal = if serializer.is_postgresql() {
                    "'[]'::jsonb"
                } else if serializer.is_mysql() {
                    "JSON_ARRAY()"
                } else {
                    "json_array()"
                };
                f.dst.push_str(literal);
            }
            ExprFunc::AsJson(expr) => {
                let expr: &Expr = expr;
                if serializer.is_sqlite() {
                    fmt!(f, "json(" expr ")");
                } else {
                    expr.to_sql(f);
                }
            }
            ExprFunc::Call(call) => {
                let name: &str = &call.name;
                fmt!(f, name "(" Comma(call.args.iter()) ")");
            }
        }
    }
}

struct JsonChunk<'a>(&'a [(String, Expr)]);

impl ToSql for JsonChunk<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let entries = self.0.iter().map(|(key, value)| JsonEntry(key, value));
        fmt!(f, "jsonb_build_object(" Comma(entries) ")");
    }
}
