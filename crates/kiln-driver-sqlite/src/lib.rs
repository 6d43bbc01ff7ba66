mod value;
pub(crate) use value::Value;

use kiln_core::{
    async_trait,
    driver::{
        operation::{Operation, Transaction},
        Capability, Driver, Provider, Response,
    },
    stmt, Error, Result, Schema,
};
use kiln_sql as sql;
use rusqlite::Connection as RusqliteConnection;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn kiln_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every in-memory connection is its own database.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }

    async fn reset_db(&self) -> Result<()> {
        if let Sqlite::File(path) = self {
            if path.exists() {
                std::fs::remove_file(path).map_err(Error::driver_operation_failed)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Self::init(connection)
    }

    fn init(connection: RusqliteConnection) -> Result<Self> {
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(Error::driver_operation_failed)?;
        Ok(Self { connection })
    }

    fn serializer() -> sql::Serializer {
        sql::Serializer::for_provider(Provider::Sqlite)
    }

    fn exec_transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = Self::serializer().serialize_transaction(&op);
        self.connection
            .execute_batch(&sql)
            .map_err(|err| Error::query_failed(&sql, Error::driver_operation_failed(err)))?;
        Ok(Response::count(0))
    }

    fn exec_sql(&mut self, stmt: &sql::Statement, ret: Option<Vec<stmt::Type>>) -> Result<Response> {
        let mut params: Vec<stmt::Value> = vec![];
        let sql_str = Self::serializer().serialize(stmt, &mut params);
        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();

        let failed = |err: rusqlite::Error| Error::query_failed(&sql_str, Error::driver_operation_failed(err));

        let mut prepared = self.connection.prepare_cached(&sql_str).map_err(failed)?;

        let Some(ret_tys) = ret else {
            let count = prepared
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(failed)?;
            return Ok(Response::count(count as u64));
        };

        let mut rows = prepared
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(failed)?;

        let mut ret = vec![];
        while let Some(row) = rows.next().map_err(failed)? {
            let mut items = Vec::with_capacity(ret_tys.len());
            for (index, ty) in ret_tys.iter().enumerate() {
                items.push(Value::from_sql(row, index, ty)?.into_inner());
            }
            ret.push(stmt::ValueRecord::from_vec(items));
        }

        Ok(Response::values(ret))
    }
}

#[async_trait]
impl kiln_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => self.exec_sql(&op.stmt.into(), op.ret),
            Operation::Transaction(op) => self.exec_transaction(op),
        }
    }

    async fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        for stmt in sql::Statement::create_schema(schema, Provider::Sqlite)? {
            let mut params: Vec<stmt::Value> = vec![];
            let sql = Self::serializer().serialize(&stmt, &mut params);
            if !params.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "schema DDL cannot take parameters; sql={sql}"
                )));
            }

            tracing::debug!(%sql, "creating table");
            self.connection
                .execute_batch(&sql)
                .map_err(|err| Error::query_failed(&sql, Error::driver_operation_failed(err)))?;
        }

        Ok(())
    }
}
