mod client;
pub use client::{CrudOperation, ModelClient};

pub mod db;
pub use db::Db;

pub mod driver;

mod engine;

pub mod hook;
pub use hook::{Mutation, MutationHook};

pub use kiln_core::{schema, stmt, Error, Result, Schema};
