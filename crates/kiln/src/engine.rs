mod args;
mod coerce;
mod defaults;
mod dialect;
mod exec;
mod lower;
mod output;
mod simplify;

#[cfg(test)]
mod test_util;

use crate::{
    hook::{Mutation, MutationHook},
    CrudOperation, Result,
};

use kiln_core::{
    driver::{Capability, Connection, IsolationLevel},
    schema::Model,
    Schema,
};

use std::sync::Arc;

pub(crate) struct Engine {
    /// Schema the engine compiles operations against.
    pub(crate) schema: Arc<Schema>,

    /// What SQL the connected backend accepts.
    pub(crate) capability: &'static Capability,

    /// Isolation level of transactions the engine opens itself.
    pub(crate) isolation: IsolationLevel,

    hooks: Vec<Arc<dyn MutationHook>>,
}

impl Engine {
    pub(crate) fn new(
        schema: Arc<Schema>,
        capability: &'static Capability,
        isolation: IsolationLevel,
        hooks: Vec<Arc<dyn MutationHook>>,
    ) -> Engine {
        Engine {
            schema,
            capability,
            isolation,
            hooks,
        }
    }

    /// Runs one operation on `connection`.
    ///
    /// `in_transaction` is true when the caller already opened a transaction
    /// on the connection; the engine then never opens its own.
    #[tracing::instrument(skip_all, fields(model = %model.name, operation = %operation))]
    pub(crate) async fn exec(
        &self,
        connection: &mut dyn Connection,
        in_transaction: bool,
        model: &Model,
        operation: CrudOperation,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut exec = exec::Exec::new(self, connection, in_transaction);

        if !operation.is_mutation() {
            return exec.dispatch(model, operation, args).await;
        }

        let wrap = !self.hooks.is_empty() || exec.needs_transaction(model, operation);
        let started = if wrap { exec.begin().await? } else { false };
        let result = self.run_mutation(&mut exec, model, operation, args).await;
        exec.finish(started, result).await
    }

    async fn run_mutation(
        &self,
        exec: &mut exec::Exec<'_>,
        model: &Model,
        operation: CrudOperation,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if self.hooks.is_empty() {
            return exec.dispatch(model, operation, args).await;
        }

        let mutation = Mutation {
            model: &model.name,
            operation,
            args: &args,
        };
        for hook in &self.hooks {
            hook.before_mutation(&mutation).await?;
        }

        let result = exec.dispatch(model, operation, args.clone()).await?;

        for hook in &self.hooks {
            hook.after_mutation(&mutation, &result).await?;
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("provider", &self.capability.provider)
            .field("isolation", &self.isolation)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
