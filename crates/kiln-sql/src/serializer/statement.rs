use super::{ident::Literal, Comma, Ident, Params, ToSql};

use crate::stmt::Statement;
use kiln_core::stmt::{self, Distinct, JoinKind, NullsOrder, OnConflict, TableRef};

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            Statement::Query(stmt) => stmt.to_sql(f),
            Statement::CreateTable(stmt) => stmt.to_sql(f),
            Statement::AddForeignKey(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Statement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            stmt::Statement::Select(stmt) => stmt.to_sql(f),
            stmt::Statement::Insert(stmt) => stmt.to_sql(f),
            stmt::Statement::Update(stmt) => stmt.to_sql(f),
            stmt::Statement::Delete(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "SELECT ");

        match &self.distinct {
            Some(Distinct::All) => fmt!(f, "DISTINCT "),
            Some(Distinct::On(exprs)) => fmt!(f, "DISTINCT ON (" Comma(exprs.iter()) ") "),
            None => {}
        }

        if self.columns.is_empty() {
            fmt!(f, "1");
        } else {
            fmt!(f, Comma(self.columns.iter()));
        }

        if let Some(from) = &self.from {
            fmt!(f, " FROM " from);
        }

        for join in &self.joins {
            let kind = match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            };
            let table = &join.table;
            let on = &join.on;
            fmt!(f, kind table " ON " on);
        }

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(self.group_by.iter()));
        }

        if let Some(having) = &self.having {
            fmt!(f, " HAVING " having);
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(self.order_by.iter()));
        }

        Limit(self.limit, self.offset).to_sql(f);
    }
}

struct Limit(Option<u64>, Option<u64>);

impl ToSql for Limit {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match (self.0, self.1) {
            (Some(limit), offset) => {
                fmt!(f, " LIMIT " limit);
                if let Some(offset) = offset {
                    fmt!(f, " OFFSET " offset);
                }
            }
            // SQLite and MySQL cannot express OFFSET without LIMIT.
            (None, Some(offset)) if f.serializer.is_sqlite() => fmt!(f, " LIMIT -1 OFFSET " offset),
            (None, Some(offset)) if f.serializer.is_mysql() => {
                fmt!(f, " LIMIT 18446744073709551615 OFFSET " offset)
            }
            (None, Some(offset)) => fmt!(f, " OFFSET " offset),
            (None, None) => {}
        }
    }
}

impl ToSql for &stmt::SelectItem {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let expr = &self.expr;
        fmt!(f, expr);
        if let Some(alias) = &self.alias {
            fmt!(f, " AS " Ident(alias));
        }
    }
}

impl ToSql for &TableRef {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            TableRef::Table { name, alias } => {
                fmt!(f, Ident(name));
                if let Some(alias) = alias {
                    fmt!(f, " AS " Ident(alias));
                }
            }
            TableRef::Subquery { select, alias } => {
                let select: &stmt::Select = select;
                fmt!(f, "(" select ") AS " Ident(alias));
            }
            TableRef::JsonEach { expr, alias } => {
                let expr: &stmt::Expr = expr;
                if f.serializer.is_postgresql() {
                    fmt!(f, "jsonb_array_elements(" expr ") AS " Ident(alias) "(" Ident("value") ")");
                } else if f.serializer.is_mysql() {
                    fmt!(
                        f,
                        "JSON_TABLE(" expr ", " Literal("$[*]") " COLUMNS (" Ident("value")
                        " JSON PATH " Literal("$") ")) AS " Ident(alias)
                    );
                } else {
                    fmt!(f, "json_each(" expr ") AS " Ident(alias));
                }
            }
        }
    }
}

impl ToSql for &stmt::OrderByExpr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let expr = &self.expr;
        let direction = if self.direction.is_desc() { " DESC" } else { " ASC" };

        match self.nulls {
            Some(nulls) if !f.serializer.is_mysql() => {
                let nulls = match nulls {
                    NullsOrder::First => " NULLS FIRST",
                    NullsOrder::Last => " NULLS LAST",
                };
                fmt!(f, expr direction nulls);
            }
            Some(nulls) => {
                // MySQL: order by the null test first.
                let first = match nulls {
                    NullsOrder::First => " IS NULL DESC, ",
                    NullsOrder::Last => " IS NULL ASC, ",
                };
                fmt!(f, expr first expr direction);
            }
            None => fmt!(f, expr direction),
        }
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let skip_duplicates = self.on_conflict == Some(OnConflict::DoNothing);

        let verb = if skip_duplicates && f.serializer.is_sqlite() {
            "INSERT OR IGNORE INTO "
        } else if skip_duplicates && f.serializer.is_mysql() {
            "INSERT IGNORE INTO "
        } else {
            "INSERT INTO "
        };

        fmt!(f, verb Ident(&self.table));

        if self.columns.is_empty() {
            if f.serializer.is_mysql() {
                fmt!(f, " () VALUES ()");
            } else {
                fmt!(f, " DEFAULT VALUES");
            }
        } else {
            let columns = self.columns.iter().map(Ident);
            let rows = self.rows.iter().map(|row| Row(row));
            fmt!(f, " (" Comma(columns) ") VALUES " Comma(rows));
        }

        if skip_duplicates && f.serializer.is_postgresql() {
            fmt!(f, " ON CONFLICT DO NOTHING");
        }

        Returning(&self.returning).to_sql(f);
    }
}

struct Row<'a>(&'a [stmt::Expr]);

impl ToSql for Row<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "(" Comma(self.0.iter()) ")");
    }
}

struct Returning<'a>(&'a [stmt::SelectItem]);

impl ToSql for Returning<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if !self.0.is_empty() {
            fmt!(f, " RETURNING " Comma(self.0.iter()));
        }
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "UPDATE " Ident(&self.table) " SET " Comma(self.assignments.iter()));

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if let Some(limit) = self.limit {
            fmt!(f, " LIMIT " limit);
        }

        Returning(&self.returning).to_sql(f);
    }
}

impl ToSql for &stmt::Assignment {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let value = &self.value;
        fmt!(f, Ident(&self.column) " = " value);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "DELETE FROM " Ident(&self.table));

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if let Some(limit) = self.limit {
            fmt!(f, " LIMIT " limit);
        }

        Returning(&self.returning).to_sql(f);
    }
}
