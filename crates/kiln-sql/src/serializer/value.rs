use super::{Params, ToSql};

use kiln_core::stmt;

impl ToSql for &stmt::Value {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use stmt::Value::*;

        match self {
            Null => f.dst.push_str("NULL"),
            // Booleans are inlined so they work both as predicates and as
            // stored values.
            Bool(value) => {
                let literal = match (f.serializer.is_sqlite(), value) {
                    (true, true) => "1",
                    (true, false) => "0",
                    (false, true) => "TRUE",
                    (false, false) => "FALSE",
                };
                f.dst.push_str(literal);
            }
            value => {
                let placeholder = f.params.push(value);
                fmt!(f, placeholder)
            }
        }
    }
}
