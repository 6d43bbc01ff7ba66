mod aggregate;
mod create;
mod delete;
mod find;
mod nested;
mod update;
mod upsert;

use super::{
    args::{Args, Filter, Json, ReadArgs},
    dialect::{self, Dialect},
    lower::{self, Column, Lower},
    output,
    simplify::Simplify,
    Engine,
};
use crate::{CrudOperation, Result};

use kiln_core::{
    driver::{
        operation::{QuerySql, Transaction},
        Connection, Rows,
    },
    schema::Model,
    stmt::{Expr, Select, Statement, TableRef, Type, Value, ValueObject, ValueRecord},
    Error, Schema,
};
use kiln_sql::Serializer;

/// Values of a row's id fields, in `Model::id_fields` order.
pub(super) type RowId = Vec<Value>;

/// Runs one operation, and everything it recursively triggers, on a single
/// connection.
pub(crate) struct Exec<'a> {
    engine: &'a Engine,
    connection: &'a mut dyn Connection,

    /// A transaction is open on the connection, the caller's or ours.
    in_transaction: bool,
}

/// The rows a single-table UPDATE or DELETE applies to.
pub(super) enum Scope {
    Ids(Vec<RowId>),

    /// Ids selected by a query over the model.
    Query(Select),
}

impl<'a> Exec<'a> {
    pub(crate) fn new(engine: &'a Engine, connection: &'a mut dyn Connection, in_transaction: bool) -> Exec<'a> {
        Exec {
            engine,
            connection,
            in_transaction,
        }
    }

    fn schema(&self) -> &'a Schema {
        &self.engine.schema
    }

    fn lower(&self) -> Lower<'a> {
        Lower::new(&self.engine.schema, self.engine.capability)
    }

    fn dialect(&self) -> &'static dyn Dialect {
        dialect::for_provider(self.engine.capability.provider)
    }

    /// The model whose table stores the column of `field`: the delegate base
    /// it is inherited from, or `model` itself.
    fn table_of<'m>(&self, model: &'m Model, field: &str) -> Result<&'m Model>
    where
        'a: 'm,
    {
        let field = model.require_field(field)?;
        match field.origin_model.as_deref() {
            Some(origin) if !field.id => self.schema().require_model(origin),
            _ => Ok(model),
        }
    }

    pub(crate) async fn dispatch(&mut self, model: &Model, operation: CrudOperation, args: Json) -> Result<Json> {
        use CrudOperation::*;

        let args = Args::new(args)?;
        match operation {
            Create => self.create(model, args).await,
            CreateMany => self.create_many(model, args, false).await,
            CreateManyAndReturn => self.create_many(model, args, true).await,
            Update => self.update(model, args).await,
            UpdateMany => self.update_many(model, args, false).await,
            UpdateManyAndReturn => self.update_many(model, args, true).await,
            Upsert => self.upsert(model, args).await,
            Delete => self.delete(model, args).await,
            DeleteMany => self.delete_many(model, args).await,
            FindUnique => self.find_unique(model, args, false).await,
            FindUniqueOrThrow => self.find_unique(model, args, true).await,
            FindFirst => self.find_first(model, args, false).await,
            FindFirstOrThrow => self.find_first(model, args, true).await,
            FindMany => self.find_many(model, args).await,
            Count => self.count(model, args).await,
            Aggregate => self.aggregate(model, args).await,
            GroupBy => self.group_by(model, args).await,
        }
    }

    /// Whether a mutation touches more than one table or statement and must
    /// be atomic.
    pub(crate) fn needs_transaction(&self, model: &Model, operation: CrudOperation) -> bool {
        let hierarchy = model.is_delegate || model.has_base();
        match operation {
            CrudOperation::CreateMany | CrudOperation::UpdateMany => hierarchy,
            CrudOperation::DeleteMany => hierarchy || !self.explicit_cascades(model).is_empty(),
            // Single-row writes, upserts and `*AndReturn` read rows before or
            // after writing and always run in a transaction.
            _ => true,
        }
    }

    /// Opens a transaction unless one is already open. Returns whether this
    /// call opened it.
    pub(crate) async fn begin(&mut self) -> Result<bool> {
        if self.in_transaction {
            return Ok(false);
        }

        tracing::info!(isolation = ?self.engine.isolation, "begin transaction");
        self.connection
            .exec(
                Transaction::Start {
                    isolation: Some(self.engine.isolation),
                    read_only: false,
                }
                .into(),
            )
            .await?;
        self.in_transaction = true;
        Ok(true)
    }

    /// Commits or rolls back a transaction opened by `begin`.
    pub(crate) async fn finish<T>(&mut self, started: bool, result: Result<T>) -> Result<T> {
        if !started {
            return result;
        }
        self.in_transaction = false;

        match result {
            Ok(value) => {
                tracing::info!("commit transaction");
                self.connection.exec(Transaction::Commit.into()).await?;
                Ok(value)
            }
            Err(err) => {
                tracing::info!(error = %err, "rollback transaction");
                if let Err(rollback) = self.connection.exec(Transaction::Rollback.into()).await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn run(&mut self, mut stmt: Statement, ret: Option<Vec<Type>>) -> Result<Rows> {
        Simplify::new().visit_stmt_mut(&mut stmt);

        let writes_nothing = match &stmt {
            Statement::Update(update) => update.filter.as_ref().is_some_and(Expr::is_false),
            Statement::Delete(delete) => delete.filter.as_ref().is_some_and(Expr::is_false),
            _ => false,
        };
        if writes_nothing {
            return Ok(Rows::Count(0));
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let mut params: Vec<Value> = vec![];
            let sql = Serializer::for_provider(self.engine.capability.provider)
                .serialize(&stmt.clone().into(), &mut params);
            tracing::debug!(sql = %sql, params = params.len(), "statement");
        }

        let response = self.connection.exec(QuerySql { stmt, ret }.into()).await?;
        Ok(response.rows)
    }

    /// Runs a statement returning rows typed `ret`.
    pub(super) async fn query(&mut self, stmt: impl Into<Statement>, ret: Vec<Type>) -> Result<Vec<ValueRecord>> {
        Ok(self.run(stmt.into(), Some(ret)).await?.into_values())
    }

    /// Runs a statement returning the number of affected rows.
    pub(super) async fn execute(&mut self, stmt: impl Into<Statement>) -> Result<u64> {
        Ok(match self.run(stmt.into(), None).await? {
            Rows::Count(count) => count,
            rows => rows.len(),
        })
    }

    /// Runs a lowered select, keying each row by its columns.
    pub(super) async fn fetch(&mut self, select: Select, columns: &[Column]) -> Result<Vec<ValueObject>> {
        let ret = columns.iter().map(|column| column.ty.clone()).collect();
        let rows = self.query(select, ret).await?;
        Ok(output::objects(columns, rows))
    }

    /// Ids of the rows matching `filter`, at most `take` of them.
    pub(super) async fn find_ids(
        &mut self,
        model: &Model,
        filter: Option<Filter>,
        take: Option<i64>,
    ) -> Result<Vec<RowId>> {
        let args = ReadArgs {
            filter,
            take,
            ..ReadArgs::default()
        };
        let (select, _) = self.lower().select_ids(model, &args)?;
        let ret = model.id_fields().map(lower::field_type).collect();
        let rows = self.query(select, ret).await?;
        Ok(rows.into_iter().map(ValueRecord::into_vec).collect())
    }

    /// A scope selecting the ids of `model` rows matching `filter`, without
    /// reading them first.
    pub(super) fn scope_query(&self, model: &Model, filter: Option<Filter>, limit: Option<u64>) -> Result<Scope> {
        let args = ReadArgs {
            filter,
            take: limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)),
            ..ReadArgs::default()
        };
        let (select, _) = self.lower().select_ids(model, &args)?;
        Ok(Scope::Query(select))
    }

    /// WHERE clause and LIMIT of a single-table bulk write over `model`.
    /// A bare limit is pushed into the statement where the backend bounds
    /// writes; anything else is scoped through an id subquery.
    pub(super) fn bulk_scope(
        &self,
        model: &Model,
        filter: Option<Filter>,
        limit: Option<u64>,
    ) -> Result<(Option<Expr>, Option<u64>)> {
        Ok(match (filter, limit) {
            (None, None) => (None, None),
            (None, Some(limit)) if self.engine.capability.update_limit => (None, Some(limit)),
            (filter, limit) => (Some(scope_expr(model, self.scope_query(model, filter, limit)?)), None),
        })
    }
}

pub(super) fn not_found(model: &Model, action: &str) -> Error {
    Error::record_not_found(format!("no `{}` record found to {action}", model.name))
}

/// Filter matching exactly the rows in `ids`.
pub(super) fn id_filter(model: &Model, ids: &[RowId]) -> Filter {
    match &model.id_fields[..] {
        [id] => Filter::in_list(
            id.clone(),
            ids.iter().filter_map(|row| row.first().cloned()).collect(),
        ),
        fields => Filter::Or(
            ids.iter()
                .map(|row| {
                    Filter::and(
                        fields
                            .iter()
                            .zip(row)
                            .map(|(field, value)| Filter::equals(field.clone(), value.clone()))
                            .collect(),
                    )
                })
                .collect(),
        ),
    }
}

pub(super) fn row_id(model: &Model, row: &ValueObject) -> RowId {
    model
        .id_fields
        .iter()
        .map(|id| row.get_or_null(id).clone())
        .collect()
}

/// The WHERE clause of a single-table write limited to `scope`. Columns are
/// unqualified.
pub(super) fn scope_expr(model: &Model, scope: Scope) -> Expr {
    let lhs = Expr::Record(model.id_fields.iter().map(Expr::bare_column).collect()).simplify_record();

    match scope {
        Scope::Ids(ids) => {
            let list = ids
                .into_iter()
                .map(|row| Expr::Record(row.into_iter().map(Expr::Value).collect()).simplify_record())
                .collect();
            Expr::in_list(lhs, list)
        }
        Scope::Query(select) => {
            // MySQL only reads the table being written through a derived table.
            let mut outer = Select::from_table(TableRef::subquery(select, "scope"));
            for id in &model.id_fields {
                outer.column(Expr::column("scope", id), id.clone());
            }
            Expr::in_subquery(lhs, outer)
        }
    }
}
