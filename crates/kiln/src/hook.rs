//! Hook points around mutations.

use crate::{CrudOperation, Result};

use kiln_core::async_trait;

/// A mutation about to run, or that just ran.
#[derive(Debug, Clone, Copy)]
pub struct Mutation<'a> {
    pub model: &'a str,
    pub operation: CrudOperation,
    pub args: &'a serde_json::Value,
}

/// Called around every mutation, inside the transaction that wraps it.
///
/// Returning an error aborts the mutation and rolls the transaction back.
#[async_trait]
pub trait MutationHook: Send + Sync + 'static {
    async fn before_mutation(&self, mutation: &Mutation<'_>) -> Result<()> {
        let _ = mutation;
        Ok(())
    }

    async fn after_mutation(
        &self,
        mutation: &Mutation<'_>,
        result: &serde_json::Value,
    ) -> Result<()> {
        let _ = (mutation, result);
        Ok(())
    }
}
