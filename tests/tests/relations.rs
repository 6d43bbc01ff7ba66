use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, fixtures, tests, DbTest};

async fn nested_create_both_directions(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let user = db
        .model("User")
        .unwrap()
        .create(json!({
            "data": {
                "email": "w@example.com",
                "posts": { "create": [{ "title": "one" }, { "title": "two" }] },
                "profile": { "create": { "bio": "writer" } }
            },
            "include": { "posts": { "orderBy": { "title": "asc" } }, "profile": true }
        }))
        .await
        .unwrap();

    let titles: Vec<_> = user["posts"].as_array().unwrap().iter().map(|p| p["title"].clone()).collect();
    assert_eq!(titles, [json!("one"), json!("two")]);
    assert_eq!(user["posts"][0]["authorId"], user["id"]);
    assert_eq!(user["profile"]["bio"], "writer");

    let post = db
        .model("Post")
        .unwrap()
        .create(json!({
            "data": { "title": "three", "author": { "connect": { "email": "w@example.com" } } },
            "select": { "author": { "select": { "email": true } } }
        }))
        .await
        .unwrap();
    assert_eq!(post, json!({ "author": { "email": "w@example.com" } }));
}

async fn many_to_many_is_symmetric(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    db.model("Category")
        .unwrap()
        .create(json!({ "data": { "name": "rust" } }))
        .await
        .unwrap();

    db.model("Post")
        .unwrap()
        .create(json!({
            "data": {
                "title": "ownership",
                "categories": {
                    "connect": [{ "name": "rust" }],
                    "create": [{ "name": "memory" }]
                }
            }
        }))
        .await
        .unwrap();

    let category = db
        .model("Category")
        .unwrap()
        .find_unique(json!({
            "where": { "name": "rust" },
            "select": { "posts": { "select": { "title": true } } }
        }))
        .await
        .unwrap();
    assert_eq!(category, json!({ "posts": [{ "title": "ownership" }] }));

    let post = db
        .model("Post")
        .unwrap()
        .find_first(json!({
            "where": { "categories": { "some": { "name": "memory" } } },
            "select": { "title": true, "_count": { "select": { "categories": true } } }
        }))
        .await
        .unwrap();
    assert_eq!(post, json!({ "title": "ownership", "_count": { "categories": 2 } }));
}

async fn set_replaces_links(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let posts = db.model("Post").unwrap();

    let post = posts
        .create(json!({
            "data": { "title": "p", "categories": { "create": [{ "name": "a" }, { "name": "b" }] } }
        }))
        .await
        .unwrap();

    db.model("Category")
        .unwrap()
        .create(json!({ "data": { "name": "c" } }))
        .await
        .unwrap();

    let updated = posts
        .update(json!({
            "where": { "id": post["id"] },
            "data": { "categories": { "set": [{ "name": "b" }, { "name": "c" }] } },
            "select": { "categories": { "select": { "name": true }, "orderBy": { "name": "asc" } } }
        }))
        .await
        .unwrap();
    assert_eq!(updated, json!({ "categories": [{ "name": "b" }, { "name": "c" }] }));
}

async fn disconnect_is_idempotent(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let post = db
        .model("Post")
        .unwrap()
        .create(json!({
            "data": { "title": "t", "author": { "create": { "email": "a@example.com" } } }
        }))
        .await
        .unwrap();

    for _ in 0..2 {
        let updated = db
            .model("Post")
            .unwrap()
            .update(json!({
                "where": { "id": post["id"] },
                "data": { "author": { "disconnect": true } }
            }))
            .await
            .unwrap();
        assert!(updated["authorId"].is_null());
    }

    // The user survives being disconnected.
    assert_eq!(db.model("User").unwrap().count(json!({})).await.unwrap(), json!(1));
}

async fn required_relation_cannot_disconnect(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let profile = db
        .model("Profile")
        .unwrap()
        .create(json!({
            "data": { "bio": "b", "user": { "create": { "email": "p@example.com" } } }
        }))
        .await
        .unwrap();

    assert_err!(
        db.model("Profile")
            .unwrap()
            .update(json!({ "where": { "id": profile["id"] }, "data": { "user": { "disconnect": true } } }))
            .await,
        is_invalid_argument
    );
}

async fn order_by_relation_count(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    for (email, count) in [("two@x.io", 2), ("zero@x.io", 0), ("five@x.io", 5)] {
        let posts: Vec<_> = (0..count).map(|i| json!({ "title": format!("{email}-{i}") })).collect();
        users
            .create(json!({ "data": { "email": email, "posts": { "create": posts } } }))
            .await
            .unwrap();
    }

    let ordered = users
        .find_many(json!({
            "orderBy": { "posts": { "_count": "desc" } },
            "select": { "email": true, "_count": { "select": { "posts": true } } }
        }))
        .await
        .unwrap();
    assert_eq!(
        ordered,
        json!([
            { "email": "five@x.io", "_count": { "posts": 5 } },
            { "email": "two@x.io", "_count": { "posts": 2 } },
            { "email": "zero@x.io", "_count": { "posts": 0 } }
        ])
    );
}

async fn relation_filters(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "pub@x.io", "posts": { "create": [{ "title": "a", "published": true }] } } }))
        .await
        .unwrap();
    users
        .create(json!({ "data": { "email": "draft@x.io", "posts": { "create": [{ "title": "b" }] } } }))
        .await
        .unwrap();
    users
        .create(json!({ "data": { "email": "none@x.io" } }))
        .await
        .unwrap();

    let emails = |value: serde_json::Value| -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["email"].as_str().unwrap().to_string())
            .collect()
    };

    let some = users
        .find_many(json!({ "where": { "posts": { "some": { "published": true } } }, "orderBy": { "email": "asc" } }))
        .await
        .unwrap();
    assert_eq!(emails(some), ["pub@x.io"]);

    let none = users
        .find_many(json!({ "where": { "posts": { "none": {} } } }))
        .await
        .unwrap();
    assert_eq!(emails(none), ["none@x.io"]);

    let every = users
        .find_many(json!({ "where": { "posts": { "every": { "published": false } } }, "orderBy": { "email": "asc" } }))
        .await
        .unwrap();
    assert_eq!(emails(every), ["draft@x.io", "none@x.io"]);
}

async fn nested_delete_many_and_update_many(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    let user = users
        .create(json!({
            "data": {
                "email": "n@x.io",
                "posts": { "create": [{ "title": "keep" }, { "title": "drop" }, { "title": "drop" }] }
            }
        }))
        .await
        .unwrap();

    let updated = users
        .update(json!({
            "where": { "id": user["id"] },
            "data": {
                "posts": {
                    "deleteMany": { "title": "drop" },
                    "updateMany": { "where": { "title": "keep" }, "data": { "published": true } }
                }
            },
            "select": { "posts": { "select": { "title": true, "published": true } } }
        }))
        .await
        .unwrap();
    assert_eq!(updated, json!({ "posts": [{ "title": "keep", "published": true }] }));
}

async fn to_one_actions_run_in_payload_order(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();
    let posts = db.model("Post").unwrap();

    users.create(json!({ "data": { "email": "a@x.io" } })).await.unwrap();
    let b = users.create(json!({ "data": { "email": "b@x.io" } })).await.unwrap();
    let post = posts
        .create(json!({ "data": { "title": "t", "author": { "connect": { "email": "a@x.io" } } } }))
        .await
        .unwrap();

    let updated = posts
        .update(json!({
            "where": { "id": post["id"] },
            "data": { "author": { "disconnect": true, "connect": { "email": "b@x.io" } } }
        }))
        .await
        .unwrap();
    assert_eq!(updated["authorId"], b["id"]);

    let updated = posts
        .update(json!({
            "where": { "id": post["id"] },
            "data": { "author": { "connect": { "email": "a@x.io" }, "disconnect": true } }
        }))
        .await
        .unwrap();
    assert!(updated["authorId"].is_null());
}

async fn connect_or_create(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();
    let posts = db.model("Post").unwrap();

    let first = posts
        .create(json!({
            "data": {
                "title": "first",
                "author": { "connectOrCreate": { "where": { "email": "c@x.io" }, "create": { "email": "c@x.io", "name": "created" } } }
            }
        }))
        .await
        .unwrap();
    let second = posts
        .create(json!({
            "data": {
                "title": "second",
                "author": { "connectOrCreate": { "where": { "email": "c@x.io" }, "create": { "email": "c@x.io", "name": "ignored" } } }
            }
        }))
        .await
        .unwrap();
    assert_eq!(first["authorId"], second["authorId"]);
    assert_eq!(users.count(json!({})).await.unwrap(), json!(1));
    let author = users
        .find_unique(json!({ "where": { "email": "c@x.io" }, "select": { "name": true } }))
        .await
        .unwrap();
    assert_eq!(author, json!({ "name": "created" }));

    let other = users
        .create(json!({
            "data": {
                "email": "d@x.io",
                "posts": {
                    "connectOrCreate": [
                        { "where": { "id": first["id"] }, "create": { "title": "unused" } },
                        { "where": { "id": 9999 }, "create": { "title": "fresh" } }
                    ]
                }
            },
            "select": { "posts": { "select": { "title": true }, "orderBy": { "title": "asc" } } }
        }))
        .await
        .unwrap();
    assert_eq!(other, json!({ "posts": [{ "title": "first" }, { "title": "fresh" }] }));
}

async fn nested_upsert(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    let user = users
        .create(json!({
            "data": { "email": "u@x.io", "posts": { "create": [{ "title": "draft" }] } },
            "include": { "posts": true }
        }))
        .await
        .unwrap();
    let post_id = user["posts"][0]["id"].clone();

    let updated = users
        .update(json!({
            "where": { "id": user["id"] },
            "data": {
                "posts": {
                    "upsert": [
                        { "where": { "id": post_id }, "create": { "title": "unused" }, "update": { "title": "edited" } },
                        { "where": { "id": 9999 }, "create": { "title": "added" }, "update": { "title": "unused" } }
                    ]
                }
            },
            "select": { "posts": { "select": { "title": true }, "orderBy": { "title": "asc" } } }
        }))
        .await
        .unwrap();
    assert_eq!(updated, json!({ "posts": [{ "title": "added" }, { "title": "edited" }] }));

    for bio in ["new", "changed"] {
        let updated = users
            .update(json!({
                "where": { "id": user["id"] },
                "data": { "profile": { "upsert": { "create": { "bio": "new" }, "update": { "bio": "changed" } } } },
                "select": { "profile": { "select": { "bio": true } } }
            }))
            .await
            .unwrap();
        assert_eq!(updated, json!({ "profile": { "bio": bio } }));
    }
}

async fn one_to_one_connect_moves_the_slot(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();
    let badges = db.model("Badge").unwrap();

    let ann = users.create(json!({ "data": { "email": "ann@x.io" } })).await.unwrap();
    let gold = badges
        .create(json!({ "data": { "label": "gold", "holder": { "connect": { "email": "ann@x.io" } } } }))
        .await
        .unwrap();
    assert_eq!(gold["holderId"], ann["id"]);

    let silver = badges
        .create(json!({ "data": { "label": "silver", "holder": { "connect": { "email": "ann@x.io" } } } }))
        .await
        .unwrap();
    assert_eq!(silver["holderId"], ann["id"]);
    let gold = badges
        .find_unique(json!({ "where": { "label": "gold" } }))
        .await
        .unwrap();
    assert!(gold["holderId"].is_null());

    // Connecting from the side without the key frees the previous holder too.
    let bob = users
        .create(json!({
            "data": { "email": "bob@x.io", "badge": { "connect": { "label": "silver" } } },
            "include": { "badge": true }
        }))
        .await
        .unwrap();
    assert_eq!(bob["badge"]["label"], "silver");
    let ann = users
        .find_unique(json!({ "where": { "email": "ann@x.io" }, "include": { "badge": true } }))
        .await
        .unwrap();
    assert!(ann["badge"].is_null());
}

async fn required_one_to_one_slot_cannot_move(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let profiles = db.model("Profile").unwrap();

    profiles
        .create(json!({ "data": { "bio": "first", "user": { "create": { "email": "p@x.io" } } } }))
        .await
        .unwrap();

    assert_err!(
        profiles
            .create(json!({ "data": { "bio": "second", "user": { "connect": { "email": "p@x.io" } } } }))
            .await,
        is_invalid_argument
    );
    assert_eq!(profiles.count(json!({})).await.unwrap(), json!(1));
}

async fn order_by_to_one_field(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();
    let posts = db.model("Post").unwrap();

    for email in ["a@x.io", "b@x.io"] {
        users.create(json!({ "data": { "email": email } })).await.unwrap();
    }
    for (title, author) in [("p1", "b@x.io"), ("p2", "a@x.io"), ("p3", "b@x.io")] {
        posts
            .create(json!({ "data": { "title": title, "author": { "connect": { "email": author } } } }))
            .await
            .unwrap();
    }

    let ordered = posts
        .find_many(json!({
            "orderBy": [{ "author": { "email": "asc" } }, { "title": "desc" }],
            "select": { "title": true }
        }))
        .await
        .unwrap();
    assert_eq!(ordered, json!([{ "title": "p2" }, { "title": "p3" }, { "title": "p1" }]));
}

tests!(
    nested_create_both_directions,
    many_to_many_is_symmetric,
    set_replaces_links,
    disconnect_is_idempotent,
    required_relation_cannot_disconnect,
    order_by_relation_count,
    relation_filters,
    nested_delete_many_and_update_many,
    to_one_actions_run_in_payload_order,
    connect_or_create,
    nested_upsert,
    one_to_one_connect_moves_the_slot,
    required_one_to_one_slot_cannot_move,
    order_by_to_one_field,
);
