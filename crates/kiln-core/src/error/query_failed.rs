use super::{Error, ErrorKind};

/// The database rejected a statement.
#[derive(Debug)]
pub(super) struct QueryFailedError {
    sql: Box<str>,
}

impl std::error::Error for QueryFailedError {}

impl core::fmt::Display for QueryFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "query failed: {}", self.sql)
    }
}

impl Error {
    /// Wraps `cause` with the SQL text of the statement that failed.
    pub fn query_failed(sql: impl Into<String>, cause: Error) -> Error {
        cause.context(Error::from(ErrorKind::QueryFailed(QueryFailedError {
            sql: sql.into().into(),
        })))
    }

    /// Returns `true` if this error came from executing a statement.
    pub fn is_query_failed(&self) -> bool {
        self.any_kind(|kind| matches!(kind, ErrorKind::QueryFailed(_)))
    }

    /// The SQL text of the failed statement, if any.
    pub fn failed_sql(&self) -> Option<&str> {
        self.chain().find_map(|err| match err.kind() {
            ErrorKind::QueryFailed(err) => Some(&*err.sql),
            _ => None,
        })
    }
}
