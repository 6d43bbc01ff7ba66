use super::{Error, ErrorKind};

/// Error when a record lookup (by query or key) returns no results.
#[derive(Debug)]
pub(super) struct RecordNotFoundError {
    context: Box<str>,
}

impl std::error::Error for RecordNotFoundError {}

impl core::fmt::Display for RecordNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record not found: {}", self.context)
    }
}

impl Error {
    /// Creates a record-not-found error. `context` usually names the model.
    pub fn record_not_found(context: impl Into<String>) -> Error {
        Error::from(ErrorKind::RecordNotFound(RecordNotFoundError {
            context: context.into().into(),
        }))
    }

    /// Returns `true` if this error is a record-not-found error.
    pub fn is_record_not_found(&self) -> bool {
        self.any_kind(|kind| matches!(kind, ErrorKind::RecordNotFound(_)))
    }
}
