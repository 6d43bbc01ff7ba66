mod capability;
pub use capability::{Capability, Provider};

mod response;
pub use response::{Response, Rows};

pub mod operation;
pub use operation::{IsolationLevel, Operation};

use crate::{async_trait, Schema};

use std::{borrow::Cow, fmt::Debug};

/// A factory for database connections.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// The connection URL the driver was created from.
    fn url(&self) -> Cow<'_, str>;

    /// Describes what SQL the backend accepts.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection.
    async fn connect(&self) -> crate::Result<Box<dyn Connection>>;

    /// Upper bound on concurrently open connections, if the backend has one.
    fn max_connections(&self) -> Option<usize> {
        None
    }

    /// Drops all data so tests start from an empty database.
    async fn reset_db(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// A single open connection. Never shared across concurrent operations.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Execute a database operation
    async fn exec(&mut self, op: Operation) -> crate::Result<Response>;

    /// Creates the tables described by `schema`.
    async fn push_schema(&mut self, schema: &Schema) -> crate::Result<()>;
}
