mod statement_cache;
use statement_cache::StatementCache;

mod value;
pub(crate) use value::Value;

use kiln_core::{
    async_trait,
    driver::{
        operation::{Operation, Transaction},
        Capability, Driver, Provider, Response,
    },
    stmt::{self, ValueRecord},
    Error, Result, Schema,
};
use kiln_sql as sql;
use std::borrow::Cow;
use tokio_postgres::{types::ToSql, Client, Config, NoTls};
use url::Url;

#[derive(Debug)]
pub struct PostgreSQL {
    url: String,
    config: Config,
}

impl PostgreSQL {
    /// Creates a driver for a `postgresql://` (or `postgres://`) URL. No
    /// connection is opened until [`Driver::connect`].
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)?;

        if !matches!(url.scheme(), "postgresql" | "postgres") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `postgresql` scheme; url={url_str}"
            )));
        }

        let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(|| {
            Error::invalid_connection_url(format!("missing host in connection URL; url={url_str}"))
        })?;

        let dbname = url.path().trim_start_matches('/');
        if dbname.is_empty() {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url_str}"
            )));
        }

        let mut config = Config::new();
        config.host(host);
        config.dbname(dbname);

        if let Some(port) = url.port() {
            config.port(port);
        }

        if !url.username().is_empty() {
            config.user(url.username());
        }

        if let Some(password) = url.password() {
            config.password(password);
        }

        Ok(Self { url: url_str, config })
    }

    /// Creates a driver from an existing [`tokio_postgres::Config`].
    pub fn with_config(config: Config) -> Self {
        Self {
            url: "postgresql://".to_string(),
            config,
        }
    }

    async fn open(&self) -> Result<Connection> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(Error::driver_operation_failed)?;

        tokio::spawn(async move {
            if let Err(error) = connection.await {
                tracing::error!(%error, "postgresql connection closed");
            }
        });

        Ok(Connection::new(client))
    }
}

#[async_trait]
impl Driver for PostgreSQL {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.url)
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn connect(&self) -> Result<Box<dyn kiln_core::Connection>> {
        Ok(Box::new(self.open().await?))
    }

    /// Drops every table by recreating the `public` schema.
    async fn reset_db(&self) -> Result<()> {
        let connection = self.open().await?;
        connection
            .client
            .batch_execute("DROP SCHEMA IF EXISTS public CASCADE; CREATE SCHEMA public;")
            .await
            .map_err(Error::driver_operation_failed)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Connection {
    client: Client,
    statements: StatementCache,
}

impl Connection {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            statements: StatementCache::new(),
        }
    }

    fn serializer() -> sql::Serializer {
        sql::Serializer::for_provider(Provider::Postgresql)
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|err| Error::query_failed(sql, Error::driver_operation_failed(err)))
    }

    async fn exec_sql(&mut self, stmt: &sql::Statement, ret: Option<Vec<stmt::Type>>) -> Result<Response> {
        let mut params: Vec<stmt::Value> = vec![];
        let sql_str = Self::serializer().serialize(stmt, &mut params);
        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();
        let args = params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        let failed = |err: tokio_postgres::Error| Error::query_failed(&sql_str, Error::driver_operation_failed(err));

        let prepared = self
            .statements
            .prepare(&self.client, &sql_str)
            .await
            .map_err(failed)?;

        let Some(ret_tys) = ret else {
            let count = self.client.execute(&prepared, &args).await.map_err(failed)?;
            return Ok(Response::count(count));
        };

        let rows = self.client.query(&prepared, &args).await.map_err(failed)?;

        let mut ret = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut items = Vec::with_capacity(ret_tys.len());
            for (index, ty) in ret_tys.iter().enumerate() {
                items.push(value::from_row(row, index, ty)?);
            }
            ret.push(ValueRecord::from_vec(items));
        }

        Ok(Response::values(ret))
    }
}

#[async_trait]
impl kiln_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => self.exec_sql(&op.stmt.into(), op.ret).await,
            Operation::Transaction(op) => {
                let sql = Self::serializer().serialize_transaction(&op);
                self.batch(&sql).await?;
                Ok(Response::count(0))
            }
        }
    }

    async fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        let mut ddl = vec![];
        for stmt in sql::Statement::create_schema(schema, Provider::Postgresql)? {
            let mut params: Vec<stmt::Value> = vec![];
            let sql = Self::serializer().serialize(&stmt, &mut params);
            if !params.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "schema DDL cannot take parameters; sql={sql}"
                )));
            }
            ddl.push(sql);
        }

        self.batch(&Self::serializer().serialize_transaction(&Transaction::start()))
            .await?;
        for sql in &ddl {
            tracing::debug!(%sql, "creating table");
            if let Err(err) = self.batch(sql).await {
                self.batch("ROLLBACK").await?;
                return Err(err);
            }
        }
        self.batch("COMMIT").await?;

        self.statements.clear();
        Ok(())
    }
}
