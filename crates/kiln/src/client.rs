use crate::{
    db::{Db, Transaction},
    Result,
};

use kiln_core::{schema::Model, Error};

use std::{fmt, str::FromStr};

/// Every operation a model client accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudOperation {
    Create,
    CreateMany,
    CreateManyAndReturn,
    Update,
    UpdateMany,
    UpdateManyAndReturn,
    Upsert,
    Delete,
    DeleteMany,
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Count,
    Aggregate,
    GroupBy,
}

impl CrudOperation {
    pub fn as_str(self) -> &'static str {
        use CrudOperation::*;

        match self {
            Create => "create",
            CreateMany => "createMany",
            CreateManyAndReturn => "createManyAndReturn",
            Update => "update",
            UpdateMany => "updateMany",
            UpdateManyAndReturn => "updateManyAndReturn",
            Upsert => "upsert",
            Delete => "delete",
            DeleteMany => "deleteMany",
            FindUnique => "findUnique",
            FindUniqueOrThrow => "findUniqueOrThrow",
            FindFirst => "findFirst",
            FindFirstOrThrow => "findFirstOrThrow",
            FindMany => "findMany",
            Count => "count",
            Aggregate => "aggregate",
            GroupBy => "groupBy",
        }
    }

    pub fn is_mutation(self) -> bool {
        use CrudOperation::*;

        matches!(
            self,
            Create
                | CreateMany
                | CreateManyAndReturn
                | Update
                | UpdateMany
                | UpdateManyAndReturn
                | Upsert
                | Delete
                | DeleteMany
        )
    }
}

impl fmt::Display for CrudOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use CrudOperation::*;

        Ok(match s {
            "create" => Create,
            "createMany" => CreateMany,
            "createManyAndReturn" => CreateManyAndReturn,
            "update" => Update,
            "updateMany" => UpdateMany,
            "updateManyAndReturn" => UpdateManyAndReturn,
            "upsert" => Upsert,
            "delete" => Delete,
            "deleteMany" => DeleteMany,
            "findUnique" => FindUnique,
            "findUniqueOrThrow" => FindUniqueOrThrow,
            "findFirst" => FindFirst,
            "findFirstOrThrow" => FindFirstOrThrow,
            "findMany" => FindMany,
            "count" => Count,
            "aggregate" => Aggregate,
            "groupBy" => GroupBy,
            _ => return Err(Error::invalid_argument(format!("unknown operation `{s}`"))),
        })
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Target<'a> {
    Db(&'a Db),
    Transaction(&'a Transaction),
}

impl<'a> From<&'a Db> for Target<'a> {
    fn from(value: &'a Db) -> Self {
        Target::Db(value)
    }
}

impl<'a> From<&'a Transaction> for Target<'a> {
    fn from(value: &'a Transaction) -> Self {
        Target::Transaction(value)
    }
}

/// Operations on one model, resolved once from the schema.
#[derive(Clone, Copy)]
pub struct ModelClient<'a> {
    target: Target<'a>,
    model: &'a Model,
}

macro_rules! operations {
    ( $( $(#[$attr:meta])* $name:ident => $op:ident; )* ) => {
        $(
            $(#[$attr])*
            pub async fn $name(&self, args: serde_json::Value) -> Result<serde_json::Value> {
                self.exec(CrudOperation::$op, args).await
            }
        )*
    };
}

impl<'a> ModelClient<'a> {
    pub(crate) fn new(target: Target<'a>, model: &'a Model) -> Self {
        ModelClient { target, model }
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// Runs `operation` with the given argument object.
    pub async fn exec(
        &self,
        operation: CrudOperation,
        args: serde_json::Value,
    ) -> Result<serde_json::Value> {
        match self.target {
            Target::Db(db) => {
                let mut connection = db.shared.pool.get().await?;
                db.shared
                    .engine
                    .exec(&mut **connection, false, self.model, operation, args)
                    .await
            }
            Target::Transaction(tx) => {
                let mut connection = tx.connection.lock().await;
                tx.db
                    .shared
                    .engine
                    .exec(&mut ***connection, true, self.model, operation, args)
                    .await
            }
        }
    }

    operations! {
        create => Create;
        create_many => CreateMany;
        create_many_and_return => CreateManyAndReturn;
        update => Update;
        update_many => UpdateMany;
        update_many_and_return => UpdateManyAndReturn;
        upsert => Upsert;
        delete => Delete;
        delete_many => DeleteMany;
        find_unique => FindUnique;
        find_unique_or_throw => FindUniqueOrThrow;
        find_first => FindFirst;
        find_first_or_throw => FindFirstOrThrow;
        find_many => FindMany;
        /// Returns a bare integer, or an object when `select` is given.
        count => Count;
        aggregate => Aggregate;
        group_by => GroupBy;
    }
}

impl fmt::Debug for ModelClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("model", &self.model.name)
            .finish()
    }
}
