use crate::logging_driver::DriverOp;
use kiln::driver::{Operation, Transaction};
use kiln_core::stmt::Statement;
use std::sync::{Arc, Mutex};

/// A view over the operations a test's database executed.
pub struct ExecLog {
    ops: Arc<Mutex<Vec<DriverOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<DriverOp>>>) -> Self {
        Self { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Count operations matching the given predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| predicate(&op.operation))
            .count()
    }

    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Operation) -> bool,
    {
        self.count(predicate) > 0
    }

    /// Number of `INSERT`, `UPDATE` and `DELETE` statements.
    pub fn writes(&self) -> usize {
        self.count(|op| {
            op.as_query_sql()
                .is_some_and(|query| !matches!(query.stmt, Statement::Select(_)))
        })
    }

    pub fn selects(&self) -> usize {
        self.count(|op| op.as_query_sql().is_some_and(|query| query.stmt.is_select()))
    }

    pub fn has_transaction_start(&self) -> bool {
        self.any(|op| matches!(op.as_transaction(), Some(Transaction::Start { .. })))
    }

    pub fn has_commit(&self) -> bool {
        self.any(|op| matches!(op.as_transaction(), Some(Transaction::Commit)))
    }

    pub fn has_rollback(&self) -> bool {
        self.any(|op| matches!(op.as_transaction(), Some(Transaction::Rollback)))
    }

    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the first operation from the log
    pub fn pop(&mut self) -> Option<Operation> {
        let mut ops = self.ops.lock().unwrap();
        if ops.is_empty() {
            None
        } else {
            Some(ops.remove(0).operation)
        }
    }
}
