//! Driver traits and the types exchanged with drivers.

pub use kiln_core::driver::{
    operation::{self, QuerySql, Transaction},
    Capability, Connection, Driver, IsolationLevel, Operation, Provider, Response, Rows,
};
