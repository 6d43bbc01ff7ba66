use super::{Db, Pool, PoolConfig, Shared};
use crate::{engine::Engine, hook::MutationHook, Result};

use kiln_core::{
    driver::{Driver, IsolationLevel},
    Error, Schema,
};

use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    schema: Option<Schema>,

    pool: PoolConfig,

    /// Isolation level for transactions the engine opens itself.
    isolation: Option<IsolationLevel>,

    hooks: Vec<Arc<dyn MutationHook>>,
}

impl Builder {
    /// Sets the schema the database is accessed with.
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(schema);
        self
    }

    /// Parses, verifies and sets the schema from its JSON description.
    pub fn schema_json(&mut self, json: &str) -> Result<&mut Self> {
        self.schema = Some(Schema::from_json(json)?);
        Ok(self)
    }

    pub fn pool_config(&mut self, config: PoolConfig) -> &mut Self {
        self.pool = config;
        self
    }

    pub fn max_pool_size(&mut self, max_size: usize) -> &mut Self {
        self.pool.max_size = max_size;
        self
    }

    /// Overrides the isolation level of engine-managed transactions
    /// (`REPEATABLE READ` by default).
    pub fn isolation_level(&mut self, level: IsolationLevel) -> &mut Self {
        self.isolation = Some(level);
        self
    }

    /// Registers a hook called around every mutation.
    pub fn hook(&mut self, hook: impl MutationHook) -> &mut Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        self.build(super::Connect::new(url)?).await
    }

    pub async fn build(&mut self, driver: impl Driver) -> Result<Db> {
        let schema = self
            .schema
            .take()
            .ok_or_else(|| Error::invalid_argument("no schema set on the builder"))?;

        let driver: Arc<dyn Driver> = Arc::new(driver);
        let pool = Pool::new(driver.clone(), &self.pool).await?;

        let engine = Engine::new(
            Arc::new(schema),
            pool.capability(),
            self.isolation.unwrap_or(IsolationLevel::RepeatableRead),
            std::mem::take(&mut self.hooks),
        );

        tracing::debug!(url = %driver.url(), provider = ?pool.capability().provider, "database ready");

        Ok(Db {
            shared: Arc::new(Shared {
                engine,
                pool,
                driver,
            }),
        })
    }
}
