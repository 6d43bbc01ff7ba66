use kiln::driver::{Capability, Driver};
use kiln_driver_postgresql::PostgreSQL;

use crate::Setup;

/// Connects to `KILN_TEST_POSTGRES_URL`, or a local `kiln_test` database.
///
/// Every test resets the `public` schema, so run these with
/// `--test-threads=1`.
pub struct SetupPostgreSQL {
    url: String,
}

impl SetupPostgreSQL {
    pub fn new() -> Self {
        let url = std::env::var("KILN_TEST_POSTGRES_URL")
            .unwrap_or_else(|_| "postgresql://localhost:5432/kiln_test".to_string());
        Self { url }
    }
}

impl Default for SetupPostgreSQL {
    fn default() -> Self {
        Self::new()
    }
}

impl Setup for SetupPostgreSQL {
    fn driver(&self) -> Box<dyn Driver> {
        Box::new(PostgreSQL::new(&*self.url).expect("valid postgres URL"))
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }
}
