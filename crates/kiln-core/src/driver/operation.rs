mod query_sql;
pub use query_sql::QuerySql;

mod transaction;
pub use transaction::{IsolationLevel, Transaction};

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute a SQL query
    QuerySql(QuerySql),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

impl Operation {
    pub fn as_query_sql(&self) -> Option<&QuerySql> {
        match self {
            Operation::QuerySql(query) => Some(query),
            _ => None,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Operation::Transaction(transaction) => Some(transaction),
            _ => None,
        }
    }
}
