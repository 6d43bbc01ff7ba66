use kiln::{hook::Mutation, CrudOperation, Error, MutationHook};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tests::{assert_err, fixtures, tests, DbTest};

async fn nested_failure_rolls_back(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.model("User")
            .unwrap()
            .create(json!({
                "data": {
                    "email": "a@example.com",
                    "posts": { "connect": [{ "id": 404 }] }
                }
            }))
            .await,
        is_record_not_found
    );

    let log = test.log();
    assert!(log.has_transaction_start());
    assert!(log.has_rollback());
    assert!(!log.has_commit());
    assert_eq!(db.model("User").unwrap().count(json!({})).await.unwrap(), json!(0));
}

async fn plain_create_many_is_not_wrapped(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    db.model("Order")
        .unwrap()
        .create_many(json!({ "data": [{ "status": "a", "amount": 1 }, { "status": "b", "amount": 2 }] }))
        .await
        .unwrap();

    let log = test.log();
    assert!(!log.has_transaction_start());
    assert_eq!(log.writes(), 1);
}

async fn explicit_transaction_commits(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    db.transaction(async |tx| {
        let users = tx.model("User")?;
        users.create(json!({ "data": { "email": "a@example.com" } })).await?;
        users.create(json!({ "data": { "email": "b@example.com" } })).await?;
        Ok(())
    })
    .await
    .unwrap();

    let log = test.log();
    assert_eq!(log.count(|op| op.as_transaction().is_some()), 2);
    assert!(log.has_commit());
    assert_eq!(db.model("User").unwrap().count(json!({})).await.unwrap(), json!(2));
}

async fn explicit_transaction_rolls_back(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let res: kiln::Result<()> = db
        .transaction(async |tx| {
            tx.model("User")?
                .create(json!({ "data": { "email": "a@example.com" } }))
                .await?;
            Err(Error::invalid_argument("changed my mind"))
        })
        .await;
    assert_err!(res, is_invalid_argument);

    assert!(test.log().has_rollback());
    assert_eq!(db.model("User").unwrap().count(json!({})).await.unwrap(), json!(0));
}

#[derive(Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
    reject: Option<CrudOperation>,
}

#[async_trait::async_trait]
impl MutationHook for Recorder {
    async fn before_mutation(&self, mutation: &Mutation<'_>) -> kiln::Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("before {} {}", mutation.model, mutation.operation));
        if self.reject == Some(mutation.operation) {
            return Err(Error::invalid_argument("rejected by hook"));
        }
        Ok(())
    }

    async fn after_mutation(&self, mutation: &Mutation<'_>, result: &serde_json::Value) -> kiln::Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("after {} {} {}", mutation.model, mutation.operation, result["email"]));
        Ok(())
    }
}

async fn hooks_wrap_mutations(test: &mut DbTest) {
    let seen = Arc::new(Mutex::new(vec![]));
    let mut builder = kiln::Db::builder();
    builder.schema(fixtures::blog()).hook(Recorder {
        seen: seen.clone(),
        reject: Some(CrudOperation::Delete),
    });
    let db = test.setup_db_with(builder).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "h@example.com" } }))
        .await
        .unwrap();
    users.find_many(json!({})).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        ["before User create", "after User create \"h@example.com\""]
    );
    assert!(test.log().has_commit());

    assert_err!(
        users.delete(json!({ "where": { "email": "h@example.com" } })).await,
        is_invalid_argument
    );
    assert!(test.log().has_rollback());
    assert_eq!(users.count(json!({})).await.unwrap(), json!(1));
}

tests!(
    nested_failure_rolls_back,
    plain_create_many_is_not_wrapped,
    explicit_transaction_commits,
    explicit_transaction_rolls_back,
    hooks_wrap_mutations,
);
