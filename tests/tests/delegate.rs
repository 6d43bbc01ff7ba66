use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, fixtures, tests, DbTest};

async fn sub_model_shares_base_identity(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let video = db
        .model("Video")
        .unwrap()
        .create(json!({ "data": { "duration": 90, "views": 3 } }))
        .await
        .unwrap();
    assert_eq!(video["kind"], "Video");
    assert_eq!(video["duration"], 90);
    assert_eq!(video["views"], 3);

    let asset = db
        .model("Asset")
        .unwrap()
        .find_unique(json!({ "where": { "id": video["id"] }, "select": { "id": true, "kind": true, "views": true } }))
        .await
        .unwrap();
    assert_eq!(asset, json!({ "id": video["id"], "kind": "Video", "views": 3 }));
}

async fn base_model_cannot_be_created(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.model("Asset")
            .unwrap()
            .create(json!({ "data": { "kind": "Video" } }))
            .await,
        is_invalid_argument
    );
}

async fn update_spans_tables(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let images = db.model("Image").unwrap();

    let image = images
        .create(json!({ "data": { "width": 640 } }))
        .await
        .unwrap();

    let updated = images
        .update(json!({
            "where": { "id": image["id"] },
            "data": { "width": 1280, "views": { "increment": 1 } }
        }))
        .await
        .unwrap();
    assert_eq!(updated["width"], 1280);
    assert_eq!(updated["views"], 1);

    let res = db
        .model("Asset")
        .unwrap()
        .update_many(json!({ "data": { "views": 10 } }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 1 }));
}

async fn delete_through_base_removes_sub_row(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    db.model("Video")
        .unwrap()
        .create(json!({ "data": { "duration": 1 } }))
        .await
        .unwrap();
    db.model("Image")
        .unwrap()
        .create(json!({ "data": { "width": 2 } }))
        .await
        .unwrap();

    let res = db
        .model("Asset")
        .unwrap()
        .delete_many(json!({ "where": { "kind": "Video" } }))
        .await
        .unwrap();
    assert_eq!(res, json!({ "count": 1 }));

    assert_eq!(db.model("Video").unwrap().count(json!({})).await.unwrap(), json!(0));
    assert_eq!(db.model("Image").unwrap().count(json!({})).await.unwrap(), json!(1));
    assert_eq!(db.model("Asset").unwrap().count(json!({})).await.unwrap(), json!(1));
}

async fn delete_many_limit_on_hierarchy(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    assert_err!(
        db.model("Video")
            .unwrap()
            .delete_many(json!({ "limit": 1 }))
            .await,
        is_invalid_argument
    );
}

async fn base_reads_return_concrete_fields(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;

    let video = db
        .model("Video")
        .unwrap()
        .create(json!({ "data": { "duration": 5, "views": 3 } }))
        .await
        .unwrap();
    let image = db
        .model("Image")
        .unwrap()
        .create(json!({ "data": { "width": 7 } }))
        .await
        .unwrap();

    let assets = db.model("Asset").unwrap();
    let all = assets
        .find_many(json!({ "orderBy": { "id": "asc" } }))
        .await
        .unwrap();
    assert_eq!(
        all,
        json!([
            { "id": video["id"], "kind": "Video", "views": 3, "duration": 5, "ownerId": null },
            { "id": image["id"], "kind": "Image", "views": 0, "width": 7 }
        ])
    );

    let one = assets
        .find_unique(json!({ "where": { "id": image["id"] } }))
        .await
        .unwrap();
    assert_eq!(one["width"], 7);
    assert!(one.get("duration").is_none());
}

async fn deleting_owner_cascades_into_sub_model(test: &mut DbTest) {
    let db = test.setup_db(fixtures::blog()).await;
    let users = db.model("User").unwrap();

    users
        .create(json!({ "data": { "email": "owner@x.io" } }))
        .await
        .unwrap();
    db.model("Video")
        .unwrap()
        .create(json!({ "data": { "duration": 3, "owner": { "connect": { "email": "owner@x.io" } } } }))
        .await
        .unwrap();
    db.model("Image")
        .unwrap()
        .create(json!({ "data": { "width": 1 } }))
        .await
        .unwrap();

    users
        .delete(json!({ "where": { "email": "owner@x.io" } }))
        .await
        .unwrap();

    assert_eq!(db.model("Video").unwrap().count(json!({})).await.unwrap(), json!(0));
    assert_eq!(db.model("Asset").unwrap().count(json!({})).await.unwrap(), json!(1));
    assert!(test.log().has_commit());
}

tests!(
    sub_model_shares_base_identity,
    base_model_cannot_be_created,
    update_spans_tables,
    delete_through_base_removes_sub_row,
    delete_many_limit_on_hierarchy,
    base_reads_return_concrete_fields,
    deleting_owner_cascades_into_sub_model,
);
