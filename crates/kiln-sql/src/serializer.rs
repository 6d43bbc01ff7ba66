#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;
use flavor::Flavor;

mod ident;
use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

// Fragment serializers
mod create_table;
mod expr;
mod statement;
mod ty;
mod value;

use crate::stmt::Statement;

use kiln_core::driver::{operation::Transaction, IsolationLevel, Provider};

/// Serialize a statement to a SQL string
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,
}

impl Serializer {
    pub fn for_provider(provider: Provider) -> Serializer {
        match provider {
            Provider::Sqlite => Serializer::sqlite(),
            Provider::Postgresql => Serializer::postgresql(),
            Provider::Mysql => Serializer::mysql(),
        }
    }

    pub fn serialize(&self, stmt: &Statement, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params,
        };

        stmt.to_sql(&mut fmt);

        ret.push(';');
        ret
    }

    /// Serialize a transaction control operation to a SQL string.
    ///
    /// The generated SQL is flavor-specific (e.g., MySQL uses `START TRANSACTION`
    /// while other databases use `BEGIN`).
    pub fn serialize_transaction(&self, op: &Transaction) -> String {
        match op {
            Transaction::Start {
                isolation,
                read_only,
            } => self.serialize_transaction_start(*isolation, *read_only),
            Transaction::Commit => "COMMIT".to_string(),
            Transaction::Rollback => "ROLLBACK".to_string(),
        }
    }

    fn serialize_transaction_start(&self, isolation: Option<IsolationLevel>, read_only: bool) -> String {
        match self.flavor {
            Flavor::Mysql => {
                let mut sql = String::new();
                if let Some(level) = isolation {
                    sql.push_str("SET TRANSACTION ISOLATION LEVEL ");
                    sql.push_str(level.sql_name());
                    sql.push_str("; ");
                }
                sql.push_str("START TRANSACTION");
                if read_only {
                    sql.push_str(" READ ONLY");
                }
                sql
            }
            Flavor::Postgresql => {
                let mut sql = String::from("BEGIN");
                if let Some(level) = isolation {
                    sql.push_str(" ISOLATION LEVEL ");
                    sql.push_str(level.sql_name());
                }
                if read_only {
                    sql.push_str(" READ ONLY");
                }
                sql
            }
            // SQLite serializes writers; isolation levels and read-only mode
            // do not apply per transaction.
            Flavor::Sqlite => "BEGIN".to_string(),
        }
    }
}
