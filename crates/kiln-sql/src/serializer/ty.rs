use super::{Params, ToSql};

use crate::stmt::ColumnType;
use kiln_core::{schema::ScalarType, stmt};

impl ToSql for &ColumnType {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let serializer = f.serializer;

        if self.array {
            if serializer.is_postgresql() {
                fmt!(f, scalar_name(serializer, self.scalar) "[]");
            } else if serializer.is_mysql() {
                fmt!(f, "JSON");
            } else {
                fmt!(f, "TEXT");
            }
            return;
        }

        if self.auto_increment {
            if serializer.is_postgresql() {
                let serial = match self.scalar {
                    ScalarType::BigInt => "BIGSERIAL",
                    _ => "SERIAL",
                };
                fmt!(f, serial);
                return;
            }
            if serializer.is_sqlite() {
                fmt!(f, "INTEGER");
                return;
            }
        }

        fmt!(f, scalar_name(serializer, self.scalar));
    }
}

fn scalar_name(serializer: &super::Serializer, scalar: ScalarType) -> &'static str {
    use ScalarType::*;

    if serializer.is_postgresql() {
        match scalar {
            String => "TEXT",
            Boolean => "BOOLEAN",
            Int => "INTEGER",
            BigInt => "BIGINT",
            Float => "DOUBLE PRECISION",
            Decimal => "NUMERIC",
            DateTime => "TIMESTAMPTZ",
            Json => "JSONB",
            Bytes => "BYTEA",
        }
    } else if serializer.is_mysql() {
        match scalar {
            String => "VARCHAR(191)",
            Boolean => "BOOLEAN",
            Int => "INT",
            BigInt => "BIGINT",
            Float => "DOUBLE",
            Decimal => "DECIMAL(65,30)",
            DateTime => "DATETIME(3)",
            Json => "JSON",
            Bytes => "LONGBLOB",
        }
    } else {
        // Type names picked for their SQLite affinity: DECIMAL and BOOLEAN
        // get NUMERIC affinity, DATETIME keeps RFC 3339 text as text.
        match scalar {
            String => "TEXT",
            Boolean => "BOOLEAN",
            Int => "INTEGER",
            BigInt => "INTEGER",
            Float => "REAL",
            Decimal => "DECIMAL",
            DateTime => "DATETIME",
            Json => "TEXT",
            Bytes => "BLOB",
        }
    }
}

/// Type name used in `CAST(.. AS ..)`.
pub(super) fn cast_name(serializer: &super::Serializer, ty: &stmt::Type) -> &'static str {
    use stmt::Type::*;

    match ty {
        Bool => scalar_name(serializer, ScalarType::Boolean),
        I32 if serializer.is_mysql() => "SIGNED",
        I64 if serializer.is_mysql() => "SIGNED",
        I32 => scalar_name(serializer, ScalarType::Int),
        I64 => scalar_name(serializer, ScalarType::BigInt),
        F64 => scalar_name(serializer, ScalarType::Float),
        Decimal => scalar_name(serializer, ScalarType::Decimal),
        String if serializer.is_mysql() => "CHAR",
        String => "TEXT",
        Bytes if serializer.is_mysql() => "BINARY",
        Bytes => scalar_name(serializer, ScalarType::Bytes),
        DateTime => scalar_name(serializer, ScalarType::DateTime),
        Json | List(_) | Unknown => scalar_name(serializer, ScalarType::Json),
    }
}
