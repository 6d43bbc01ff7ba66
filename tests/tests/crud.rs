use kiln::stmt::Statement;
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, fixtures, tests, DbTest};

async fn create_and_find_unique(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    let created = users
        .create(json!({ "data": { "email": "ann@example.com", "name": "Ann" } }))
        .await
        .unwrap();
    assert_eq!(created["email"], "ann@example.com");
    assert_eq!(created["score"], 0);

    let found = users
        .find_unique(json!({ "where": { "email": "ann@example.com" }, "select": { "id": true, "name": true } }))
        .await
        .unwrap();
    assert_eq!(found, json!({ "id": created["id"], "name": "Ann" }));

    let missing = users
        .find_unique(json!({ "where": { "email": "nobody@example.com" } }))
        .await
        .unwrap();
    assert!(missing.is_null());
}

async fn or_throw_variants(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    assert_err!(
        users.find_unique_or_throw(json!({ "where": { "id": 42 } })).await,
        is_record_not_found
    );
    assert_err!(
        users.find_first_or_throw(json!({ "where": { "name": "ghost" } })).await,
        is_record_not_found
    );
}

async fn find_unique_requires_unique_filter(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.exec("User", "findUnique".parse().unwrap(), json!({ "where": { "name": "Ann" } }))
            .await,
        is_invalid_argument
    );
}

async fn update_with_arithmetic(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "a@example.com", "score": 10 } }))
        .await
        .unwrap();

    let updated = users
        .update(json!({
            "where": { "email": "a@example.com" },
            "data": { "score": { "increment": 5 }, "name": { "set": "Al" } }
        }))
        .await
        .unwrap();
    assert_eq!(updated["score"], 15);
    assert_eq!(updated["name"], "Al");

    let updated = users
        .update(json!({ "where": { "email": "a@example.com" }, "data": { "score": { "multiply": 2 } } }))
        .await
        .unwrap();
    assert_eq!(updated["score"], 30);
}

async fn empty_update_writes_nothing(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "a@example.com" } }))
        .await
        .unwrap();
    test.log().clear();

    let res = users
        .update_many(json!({ "where": { "email": "a@example.com" }, "data": {} }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 1 }));
    assert_eq!(test.log().writes(), 0);
}

async fn update_missing_row(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.model("User")
            .unwrap()
            .update(json!({ "where": { "id": 7 }, "data": { "name": "x" } }))
            .await,
        is_record_not_found
    );
}

async fn create_many_and_update_many(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    let res = users
        .create_many(json!({ "data": [
            { "email": "a@example.com", "score": 1 },
            { "email": "b@example.com", "score": 2 },
            { "email": "c@example.com", "score": 3 }
        ] }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 3 }));

    let res = users
        .create_many(json!({ "data": [{ "email": "a@example.com" }], "skipDuplicates": true }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 0 }));

    let res = users
        .update_many(json!({ "where": { "score": { "gte": 2 } }, "data": { "name": "many" } }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 2 }));

    let named = users
        .find_many(json!({ "where": { "name": "many" }, "orderBy": { "email": "asc" }, "select": { "email": true } }))
        .await
        .unwrap();
    assert_eq!(named, json!([{ "email": "b@example.com" }, { "email": "c@example.com" }]));
}

async fn create_many_and_return(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let rows = db
        .model("User")
        .unwrap()
        .create_many_and_return(json!({
            "data": [{ "email": "a@example.com" }, { "email": "b@example.com" }],
            "select": { "email": true }
        }))
        .await
        .unwrap();

    let mut emails: Vec<_> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["email"].as_str().unwrap().to_string())
        .collect();
    emails.sort();
    assert_eq!(emails, ["a@example.com", "b@example.com"]);
}

async fn upsert_creates_then_updates(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    let args = json!({
        "where": { "email": "u@example.com" },
        "create": { "email": "u@example.com", "score": 1 },
        "update": { "score": { "increment": 1 } }
    });

    let first = users.upsert(args.clone()).await.unwrap();
    assert_eq!(first["score"], 1);

    let second = users.upsert(args).await.unwrap();
    assert_eq!(second["score"], 2);
    assert_eq!(second["id"], first["id"]);

    assert_eq!(users.count(json!({})).await.unwrap(), json!(1));
}

async fn delete_returns_row(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "d@example.com", "name": "Dee" } }))
        .await
        .unwrap();

    let deleted = users
        .delete(json!({ "where": { "email": "d@example.com" }, "select": { "name": true } }))
        .await
        .unwrap();
    assert_eq!(deleted, json!({ "name": "Dee" }));

    assert_err!(
        users.delete(json!({ "where": { "email": "d@example.com" } })).await,
        is_record_not_found
    );
}

async fn delete_many_with_filter(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    for (email, score) in [("a@example.com", 1), ("b@example.com", 5), ("c@example.com", 9)] {
        users
            .create(json!({ "data": { "email": email, "score": score } }))
            .await
            .unwrap();
    }

    let res = users
        .delete_many(json!({ "where": { "score": { "lt": 6 } } }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 2 }));
    assert_eq!(users.count(json!({})).await.unwrap(), json!(1));
}

async fn decimals_are_normalized(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let user = db
        .model("User")
        .unwrap()
        .create(json!({ "data": { "email": "rich@example.com", "balance": "100.00" } }))
        .await
        .unwrap();
    assert_eq!(user["balance"], "100");
}

async fn pagination_and_distinct(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    for (email, score) in [("a@x.io", 1), ("b@x.io", 1), ("c@x.io", 2), ("d@x.io", 3)] {
        users
            .create(json!({ "data": { "email": email, "score": score } }))
            .await
            .unwrap();
    }

    let page = users
        .find_many(json!({ "orderBy": { "email": "asc" }, "skip": 1, "take": 2, "select": { "email": true } }))
        .await
        .unwrap();
    assert_eq!(page, json!([{ "email": "b@x.io" }, { "email": "c@x.io" }]));

    let last = users
        .find_many(json!({ "orderBy": { "email": "asc" }, "take": -1, "select": { "email": true } }))
        .await
        .unwrap();
    assert_eq!(last, json!([{ "email": "d@x.io" }]));

    let scores = users
        .find_many(json!({ "distinct": ["score"], "orderBy": { "score": "asc" }, "select": { "score": true } }))
        .await
        .unwrap();
    assert_eq!(scores, json!([{ "score": 1 }, { "score": 2 }, { "score": 3 }]));
}

async fn unknown_arguments_are_rejected(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    assert_err!(
        users.find_many(json!({ "wher": { "id": 1 } })).await,
        is_invalid_argument
    );
    assert_err!(
        users.find_many(json!({ "where": { "nope": 1 } })).await,
        is_invalid_argument
    );
    assert!(db.model("Nope").is_err());
}

async fn find_unique_reads_a_single_row(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "one@example.com" } }))
        .await
        .unwrap();
    test.log().clear();

    users
        .find_unique(json!({ "where": { "email": "one@example.com" } }))
        .await
        .unwrap();

    let log = test.log();
    assert_eq!(log.selects(), 1);
    assert!(log.any(|op| matches!(
        op.as_query_sql().map(|query| &query.stmt),
        Some(Statement::Select(select)) if select.limit == Some(1)
    )));
}

async fn order_by_keys_apply_in_order(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    for (email, score) in [("a@x.io", 1), ("b@x.io", 2), ("c@x.io", 1)] {
        users
            .create(json!({ "data": { "email": email, "score": score } }))
            .await
            .unwrap();
    }

    let ordered = users
        .find_many(json!({ "orderBy": { "score": "asc", "email": "desc" }, "select": { "email": true } }))
        .await
        .unwrap();
    assert_eq!(
        ordered,
        json!([{ "email": "c@x.io" }, { "email": "a@x.io" }, { "email": "b@x.io" }])
    );
}

async fn insensitive_string_filters(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    for email in ["Ann@Example.com", "bob@example.com"] {
        users.create(json!({ "data": { "email": email } })).await.unwrap();
    }

    let emails = |where_: serde_json::Value| {
        async move {
            let rows = users
                .find_many(json!({ "where": where_, "orderBy": { "email": "asc" }, "select": { "email": true } }))
                .await
                .unwrap();
            rows.as_array()
                .unwrap()
                .iter()
                .map(|row| row["email"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        }
    };

    assert!(emails(json!({ "email": { "contains": "ann" } })).await.is_empty());
    assert_eq!(
        emails(json!({ "email": { "contains": "ann", "mode": "insensitive" } })).await,
        ["Ann@Example.com"]
    );
    assert_eq!(
        emails(json!({ "email": { "startsWith": "ANN", "mode": "insensitive" } })).await,
        ["Ann@Example.com"]
    );
    assert_eq!(
        emails(json!({ "email": { "equals": "BOB@EXAMPLE.COM", "mode": "insensitive" } })).await,
        ["bob@example.com"]
    );
}

async fn array_fields(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let posts = db.model("Post").unwrap();

    let a = posts
        .create(json!({ "data": { "title": "a", "tags": ["rust", "db"] } }))
        .await
        .unwrap();
    assert_eq!(a["tags"], json!(["rust", "db"]));
    let b = posts
        .create(json!({ "data": { "title": "b", "tags": ["go"] } }))
        .await
        .unwrap();
    posts
        .create(json!({ "data": { "title": "c", "tags": [] } }))
        .await
        .unwrap();

    let titles = |where_: serde_json::Value| {
        async move {
            let rows = posts
                .find_many(json!({ "where": { "tags": where_ }, "orderBy": { "title": "asc" }, "select": { "title": true } }))
                .await
                .unwrap();
            rows.as_array()
                .unwrap()
                .iter()
                .map(|row| row["title"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(titles(json!({ "has": "rust" })).await, ["a"]);
    assert_eq!(titles(json!({ "hasEvery": ["rust", "db"] })).await, ["a"]);
    assert_eq!(titles(json!({ "hasSome": ["go", "db"] })).await, ["a", "b"]);
    assert_eq!(titles(json!({ "isEmpty": true })).await, ["c"]);

    let updated = posts
        .update(json!({ "where": { "id": b["id"] }, "data": { "tags": { "push": "rust" } } }))
        .await
        .unwrap();
    assert_eq!(updated["tags"], json!(["go", "rust"]));
    assert_eq!(titles(json!({ "has": "rust" })).await, ["a", "b"]);
}

tests!(
    create_and_find_unique,
    or_throw_variants,
    find_unique_requires_unique_filter,
    update_with_arithmetic,
    empty_update_writes_nothing,
    update_missing_row,
    create_many_and_update_many,
    create_many_and_return,
    upsert_creates_then_updates,
    delete_returns_row,
    delete_many_with_filter,
    decimals_are_normalized,
    pagination_and_distinct,
    unknown_arguments_are_rejected,
    find_unique_reads_a_single_row,
    order_by_keys_apply_in_order,
    insensitive_string_filters,
    array_fields,
);
