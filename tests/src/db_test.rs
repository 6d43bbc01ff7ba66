use crate::{
    logging_driver::{DriverOp, LoggingDriver},
    ExecLog, Setup,
};
use kiln::{db::Builder, driver::Capability, Db, Schema};
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

/// One test against one backend. Every database it sets up records its
/// driver operations.
pub struct DbTest {
    setup: Box<dyn Setup>,
    ops_log: Arc<Mutex<Vec<DriverOp>>>,
}

impl DbTest {
    pub fn new(setup: Box<dyn Setup>) -> Self {
        Self {
            setup,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connects with `builder`, resets the database and pushes the schema.
    pub async fn try_setup_db_with(&mut self, mut builder: Builder) -> kiln::Result<Db> {
        let driver = LoggingDriver::new(self.setup.driver());
        self.ops_log = driver.ops_log_handle();

        let db = builder.build(driver).await?;
        db.reset_db().await?;
        db.push_schema().await?;

        // Schema creation is not part of what tests assert on.
        self.ops_log.lock().unwrap().clear();
        Ok(db)
    }

    pub async fn setup_db_with(&mut self, builder: Builder) -> Db {
        self.try_setup_db_with(builder).await.unwrap()
    }

    pub async fn setup_db(&mut self, schema: Schema) -> Db {
        let mut builder = Db::builder();
        builder.schema(schema);
        self.setup_db_with(builder).await
    }

    /// The operations executed since setup or the last [`ExecLog::clear`].
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.ops_log.clone())
    }

    pub fn capability(&self) -> &'static Capability {
        self.setup.capability()
    }

    /// Runs `test_fn` to completion on a fresh current-thread runtime.
    pub fn run_test<F>(mut self, test_fn: F)
    where
        F: for<'a> FnOnce(&'a mut DbTest) -> Pin<Box<dyn Future<Output = ()> + 'a>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create Tokio runtime");

        runtime.block_on(test_fn(&mut self));
    }
}
