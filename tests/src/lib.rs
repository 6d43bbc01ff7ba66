#[macro_use]
mod macros;

pub mod db;
mod db_test;
mod exec_log;
pub mod fixtures;
mod logging_driver;

pub use db_test::DbTest;
pub use exec_log::ExecLog;
pub use logging_driver::{DriverOp, LoggingDriver};

use kiln::driver::{Capability, Driver};

pub trait Setup: Send + Sync + 'static {
    /// A fresh driver for one test.
    fn driver(&self) -> Box<dyn Driver>;

    fn capability(&self) -> &'static Capability;
}
