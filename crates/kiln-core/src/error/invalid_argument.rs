use super::{Error, ErrorKind};

/// A malformed or contradictory operation descriptor.
///
/// Raised before any statement reaches the database.
#[derive(Debug)]
pub(super) struct InvalidArgumentError {
    message: Box<str>,
}

impl std::error::Error for InvalidArgumentError {}

impl core::fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid argument: {}", self.message)
    }
}

impl Error {
    /// Creates a usage error.
    pub fn invalid_argument(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidArgument(InvalidArgumentError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a usage error.
    pub fn is_invalid_argument(&self) -> bool {
        self.any_kind(|kind| matches!(kind, ErrorKind::InvalidArgument(_)))
    }
}
