use super::{Comma, Ident, Params, ToSql};

use crate::stmt::{self, ForeignKey};
use kiln_core::schema::ReferentialAction;

impl ToSql for &stmt::CreateTable {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let inline_pk = if f.serializer.is_sqlite() {
            self.auto_increment_key()
        } else {
            None
        };

        let columns = self.columns.iter().map(|column| ColumnWithKey {
            column,
            primary_key: inline_pk.is_some_and(|pk| pk.name == column.name),
        });

        fmt!(f, "CREATE TABLE " Ident(&self.name) " (" Comma(columns));

        if inline_pk.is_none() && !self.primary_key.is_empty() {
            let pk = Comma(self.primary_key.iter().map(Ident));
            fmt!(f, ", PRIMARY KEY (" pk ")");
        }

        for unique in &self.unique {
            fmt!(f, ", UNIQUE (" Comma(unique.iter().map(Ident)) ")");
        }

        for foreign_key in &self.foreign_keys {
            fmt!(f, ", " foreign_key);
        }

        fmt!(f, ")");
    }
}

struct ColumnWithKey<'a> {
    column: &'a stmt::ColumnDef,
    primary_key: bool,
}

impl ToSql for ColumnWithKey<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let column = self.column;
        let ty = &column.ty;

        fmt!(f, Ident(&column.name) " " ty);

        if self.primary_key {
            fmt!(f, " PRIMARY KEY AUTOINCREMENT");
            return;
        }

        if !column.nullable {
            fmt!(f, " NOT NULL");
        }

        if column.ty.auto_increment && f.serializer.is_mysql() {
            fmt!(f, " AUTO_INCREMENT");
        }
    }
}

impl ToSql for &ForeignKey {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let columns = Comma(self.columns.iter().map(Ident));
        let references = Comma(self.references_columns.iter().map(Ident));

        fmt!(
            f,
            "FOREIGN KEY (" columns ") REFERENCES " Ident(&self.references_table)
            " (" references ")"
        );

        if let Some(action) = self.on_delete {
            fmt!(f, " ON DELETE " action_sql(action));
        }

        if let Some(action) = self.on_update {
            fmt!(f, " ON UPDATE " action_sql(action));
        }
    }
}

impl ToSql for &stmt::AddForeignKey {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let foreign_key = &self.foreign_key;
        fmt!(
            f,
            "ALTER TABLE " Ident(&self.table) " ADD CONSTRAINT " Ident(&self.name) " " foreign_key
        );
    }
}

fn action_sql(action: ReferentialAction) -> &'static str {
    match action {
        ReferentialAction::Cascade => "CASCADE",
        ReferentialAction::Restrict => "RESTRICT",
        ReferentialAction::NoAction => "NO ACTION",
        ReferentialAction::SetNull => "SET NULL",
        ReferentialAction::SetDefault => "SET DEFAULT",
    }
}
