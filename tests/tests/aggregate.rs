use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, fixtures, tests, DbTest};

async fn seed_orders(db: &kiln::Db) {
    db.model("Order")
        .unwrap()
        .create_many(json!({ "data": [
            { "status": "paid", "amount": 1, "total": "1.50" },
            { "status": "paid", "amount": 2, "total": "2.25" },
            { "status": "open", "amount": 3 }
        ] }))
        .await
        .unwrap();
}

async fn count_forms(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    seed_orders(&db).await;
    let orders = db.model("Order").unwrap();

    assert_eq!(orders.count(json!({})).await.unwrap(), json!(3));
    assert_eq!(
        orders.count(json!({ "where": { "status": "paid" } })).await.unwrap(),
        json!(2)
    );
    assert_eq!(
        orders
            .count(json!({ "select": { "_all": true, "total": true } }))
            .await
            .unwrap(),
        json!({ "_all": 3, "total": 2 })
    );
}

async fn aggregate_sums(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    seed_orders(&db).await;

    let res = db
        .model("Order")
        .unwrap()
        .aggregate(json!({
            "_sum": { "amount": true, "total": true },
            "_max": { "amount": true },
            "_count": { "_all": true }
        }))
        .await
        .unwrap();

    assert_eq!(res["_sum"]["amount"], 6);
    assert_eq!(res["_sum"]["total"], "3.75");
    assert_eq!(res["_max"]["amount"], 3);
    assert_eq!(res["_count"]["_all"], 3);
}

async fn aggregate_of_nothing(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let res = db
        .model("Order")
        .unwrap()
        .aggregate(json!({ "_sum": { "amount": true }, "_count": { "_all": true } }))
        .await
        .unwrap();

    assert!(res["_sum"]["amount"].is_null());
    assert_eq!(res["_count"]["_all"], 0);
}

async fn group_by_with_having(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    seed_orders(&db).await;
    let orders = db.model("Order").unwrap();

    let groups = orders
        .group_by(json!({
            "by": ["status"],
            "_sum": { "amount": true },
            "orderBy": { "status": "asc" }
        }))
        .await
        .unwrap();
    assert_eq!(
        groups,
        json!([
            { "status": "open", "_sum": { "amount": 3 } },
            { "status": "paid", "_sum": { "amount": 3 } }
        ])
    );

    let groups = orders
        .group_by(json!({
            "by": ["status"],
            "_count": { "_all": true },
            "having": { "amount": { "_count": { "gt": 1 } } }
        }))
        .await
        .unwrap();
    assert_eq!(groups, json!([{ "status": "paid", "_count": { "_all": 2 } }]));
}

async fn group_by_rejects_foreign_order(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.model("Order")
            .unwrap()
            .group_by(json!({ "by": ["status"], "orderBy": { "amount": "asc" } }))
            .await,
        is_invalid_argument
    );
    assert_err!(
        db.model("Order").unwrap().group_by(json!({ "by": [] })).await,
        is_invalid_argument
    );
}

tests!(
    count_forms,
    aggregate_sums,
    aggregate_of_nothing,
    group_by_with_having,
    group_by_rejects_foreign_order,
);
