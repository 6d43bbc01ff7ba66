mod builder;
pub use builder::Builder;

mod connect;
pub use connect::Connect;

mod pool;
pub use pool::{Pool, PoolConfig, PoolConnection, Timeouts};

mod transaction;
pub use transaction::Transaction;

use crate::{engine::Engine, CrudOperation, ModelClient, Result};

use kiln_core::{
    driver::{Capability, Driver},
    Schema,
};

use std::sync::Arc;

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    pub(crate) engine: Engine,
    pub(crate) pool: Pool,
    pub(crate) driver: Arc<dyn Driver>,
}

/// A database handle. Cheap to clone; every clone shares the schema and the
/// connection pool.
#[derive(Clone)]
pub struct Db {
    pub(crate) shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.engine.schema
    }

    pub fn capability(&self) -> &'static Capability {
        self.shared.pool.capability()
    }

    /// Returns a client for the named model.
    ///
    /// Fails with a usage error when the schema has no such model.
    pub fn model(&self, name: &str) -> Result<ModelClient<'_>> {
        let model = self.shared.engine.schema.require_model(name)?;
        Ok(ModelClient::new(self.into(), model))
    }

    /// Runs one operation against a model, addressed by name.
    pub async fn exec(
        &self,
        model: &str,
        operation: CrudOperation,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.model(model)?.exec(operation, args).await
    }

    /// Creates the tables described by the schema.
    pub async fn push_schema(&self) -> Result<()> {
        let mut connection = self.shared.pool.get().await?;
        connection.push_schema(&self.shared.engine.schema).await
    }

    /// Drops all data, delegating to the driver.
    pub async fn reset_db(&self) -> Result<()> {
        self.shared.driver.reset_db().await
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("url", &self.shared.driver.url())
            .field("pool", &self.shared.pool)
            .finish()
    }
}
