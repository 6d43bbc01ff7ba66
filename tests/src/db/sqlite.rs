use kiln::driver::{Capability, Driver};
use kiln_driver_sqlite::Sqlite;

use crate::Setup;

pub struct SetupSqlite;

impl SetupSqlite {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SetupSqlite {
    fn default() -> Self {
        Self::new()
    }
}

impl Setup for SetupSqlite {
    fn driver(&self) -> Box<dyn Driver> {
        Box::new(Sqlite::in_memory())
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }
}
