use super::{Db, PoolConnection};
use crate::{CrudOperation, ModelClient, Result};

use kiln_core::driver::operation::Transaction as TransactionOp;
use tokio::sync::Mutex;

/// A database transaction. Every operation issued through it runs on the
/// same connection, and the engine does not open nested transactions.
pub struct Transaction {
    pub(crate) db: Db,
    pub(crate) connection: Mutex<PoolConnection>,
}

impl Transaction {
    /// Returns a client for the named model bound to this transaction.
    pub fn model(&self, name: &str) -> Result<ModelClient<'_>> {
        let model = self.db.shared.engine.schema.require_model(name)?;
        Ok(ModelClient::new(self.into(), model))
    }

    pub async fn exec(
        &self,
        model: &str,
        operation: CrudOperation,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.model(model)?.exec(operation, args).await
    }
}

impl Db {
    /// Runs `f` inside a transaction. Commits when `f` returns `Ok`, rolls
    /// back otherwise.
    pub async fn transaction<O>(
        &self,
        f: impl AsyncFnOnce(&Transaction) -> Result<O>,
    ) -> Result<O> {
        let mut connection = self.shared.pool.get().await?;

        let start = TransactionOp::Start {
            isolation: Some(self.shared.engine.isolation),
            read_only: false,
        };
        connection.exec(start.into()).await?;
        tracing::info!("transaction started");

        let tx = Transaction {
            db: self.clone(),
            connection: Mutex::new(connection),
        };

        let res = f(&tx).await;
        let mut connection = tx.connection.into_inner();

        match res {
            Ok(value) => {
                connection.exec(TransactionOp::Commit.into()).await?;
                tracing::info!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = connection.exec(TransactionOp::Rollback.into()).await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::info!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}
