use super::*;
use crate::engine::{
    args::{Args, ReadArgs},
    test_util,
};

use kiln_core::{driver::Provider, stmt::Value};
use kiln_sql::Serializer;
use serde_json::json;

fn read_sql(provider: Provider, model: &str, args: serde_json::Value) -> (String, Vec<Value>) {
    let schema = test_util::blog();
    let model = schema.require_model(model).unwrap();
    let mut args = Args::new(args).unwrap();
    let read = ReadArgs::take(&schema, model, &mut args).unwrap();
    args.finish("test").unwrap();

    let mut lower = Lower::new(&schema, Capability::for_provider(provider));
    let query = lower.read(model, &read).unwrap();
    let mut params = vec![];
    let sql = Serializer::for_provider(provider).serialize(&query.select.into(), &mut params);
    (sql, params)
}

#[test]
fn scalar_filter_and_projection() {
    let (sql, params) = read_sql(Provider::Sqlite, "User", json!({ "where": { "email": "a@x.io" } }));
    assert!(sql.starts_with(r#"SELECT "t0"."id" AS "id", "t0"."email" AS "email""#), "{sql}");
    assert!(sql.contains(r#"FROM "User" AS "t0" WHERE "t0"."email" = ?1"#), "{sql}");
    assert_eq!(params, vec![Value::from("a@x.io")]);
}

#[test]
fn placeholders_follow_the_backend() {
    let where_ = json!({ "where": { "score": { "gt": 1, "lt": 9 } } });
    let (sql, _) = read_sql(Provider::Postgresql, "User", where_.clone());
    assert!(sql.contains(r#""t0"."score" > $1 AND "t0"."score" < $2"#), "{sql}");

    let (sql, _) = read_sql(Provider::Mysql, "User", where_);
    assert!(sql.contains("`t0`.`score` > ? AND `t0`.`score` < ?"), "{sql}");
}

#[test]
fn negative_take_reverses_the_default_order() {
    let (sql, _) = read_sql(Provider::Sqlite, "Post", json!({ "take": -2 }));
    assert!(sql.ends_with(r#"ORDER BY "t0"."id" DESC LIMIT 2;"#), "{sql}");
}

#[test]
fn skip_without_take_on_sqlite() {
    let (sql, _) = read_sql(Provider::Sqlite, "Post", json!({ "skip": 3 }));
    assert!(sql.ends_with("LIMIT -1 OFFSET 3;"), "{sql}");
}

#[test]
fn to_one_filter_on_the_key_side_checks_the_key() {
    let (sql, _) = read_sql(Provider::Sqlite, "Post", json!({ "where": { "author": null } }));
    assert!(sql.contains(r#"WHERE "t0"."authorId" IS NULL"#), "{sql}");
}

#[test]
fn to_one_filter_on_the_other_side_uses_exists() {
    let (sql, _) = read_sql(Provider::Sqlite, "User", json!({ "where": { "profile": { "bio": "x" } } }));
    assert!(
        sql.contains(r#"WHERE EXISTS (SELECT 1 FROM "Profile" AS "t1" WHERE ("t1"."userId" = "t0"."id" AND "t1"."bio" = ?1))"#),
        "{sql}"
    );
}

#[test]
fn to_many_filters_count_matches() {
    let (sql, _) = read_sql(
        Provider::Sqlite,
        "User",
        json!({ "where": { "posts": { "every": { "published": true } } } }),
    );
    assert!(sql.contains(r#"NOT ("t1"."published" = 1)"#), "{sql}");
    assert!(sql.contains(") = ?1"), "{sql}");

    let (sql, _) = read_sql(Provider::Sqlite, "User", json!({ "where": { "posts": { "some": {} } } }));
    assert!(sql.contains(r#"(SELECT COUNT(*) AS "count" FROM "Post" AS "t1" WHERE "t1"."authorId" = "t0"."id") > ?1"#), "{sql}");
}

#[test]
fn many_to_many_links_through_the_join_table() {
    let (sql, _) = read_sql(Provider::Sqlite, "Post", json!({ "include": { "categories": true } }));
    assert!(sql.contains(r#"IN (SELECT "#), "{sql}");
    assert!(sql.contains("json_group_array(json("), "{sql}");
    assert!(sql.contains("json_array()"), "{sql}");
}

#[test]
fn nested_relations_are_json_subqueries() {
    let (sql, _) = read_sql(
        Provider::Postgresql,
        "User",
        json!({ "select": { "email": true, "posts": { "select": { "title": true }, "take": 2 } } }),
    );
    assert!(sql.contains("jsonb_build_object('title', \"t1\".\"title\")"), "{sql}");
    assert!(sql.contains("COALESCE(jsonb_agg("), "{sql}");
    assert!(sql.contains("'[]'::jsonb"), "{sql}");
    assert!(sql.contains("LIMIT 2"), "{sql}");
}

#[test]
fn relation_counts_are_flat_columns() {
    let (sql, _) = read_sql(Provider::Sqlite, "User", json!({ "include": { "_count": { "select": { "posts": true } } } }));
    assert!(sql.contains(r#"AS "_count.posts""#), "{sql}");
}

#[test]
fn sub_models_join_their_base() {
    let (sql, _) = read_sql(Provider::Sqlite, "Video", json!({ "where": { "views": { "gt": 3 } } }));
    assert!(
        sql.contains(r#"FROM "Video" AS "t0" INNER JOIN "Asset" AS "t0$Asset" ON "t0"."id" = "t0$Asset"."id""#),
        "{sql}"
    );
    assert!(sql.contains(r#""t0$Asset"."views" > ?1"#), "{sql}");
}

#[test]
fn delegate_reads_join_every_sub_model() {
    let (sql, _) = read_sql(Provider::Sqlite, "Asset", json!({}));
    assert!(sql.contains(r#"LEFT JOIN "Video" AS "t0$Video""#), "{sql}");
    assert!(sql.contains(r#"LEFT JOIN "Image" AS "t0$Image""#), "{sql}");
    assert!(sql.contains(r#""t0$Video"."duration" AS "Video$duration""#), "{sql}");
}

#[test]
fn distinct_on_where_supported() {
    let (sql, _) = read_sql(Provider::Postgresql, "Post", json!({ "distinct": ["title"] }));
    assert!(sql.starts_with(r#"SELECT DISTINCT ON ("t0"."title")"#), "{sql}");

    let schema = test_util::blog();
    let model = schema.require_model("Post").unwrap();
    let mut args = Args::new(json!({ "distinct": "title", "take": 1 })).unwrap();
    let read = ReadArgs::take(&schema, model, &mut args).unwrap();
    let query = Lower::new(&schema, Capability::for_provider(Provider::Sqlite))
        .read(model, &read)
        .unwrap();
    assert_eq!(query.select.limit, None);
    assert_eq!(query.in_memory.distinct, vec!["title".to_string()]);
    assert_eq!(query.in_memory.take, Some(1));
}

#[test]
fn ordering_by_a_to_one_path() {
    let (sql, _) = read_sql(Provider::Sqlite, "Post", json!({ "orderBy": { "author": { "email": "desc" } } }));
    assert!(
        sql.contains(r#"ORDER BY (SELECT "t1"."email" AS "v" FROM "User" AS "t1" WHERE "t1"."id" = "t0"."authorId" LIMIT 1) DESC"#),
        "{sql}"
    );
}

#[test]
fn insensitive_contains() {
    let (sql, params) = read_sql(
        Provider::Sqlite,
        "User",
        json!({ "where": { "email": { "contains": "A_b", "mode": "insensitive" } } }),
    );
    assert!(sql.contains(r#"LOWER("t0"."email") LIKE LOWER(?1) ESCAPE '\'"#), "{sql}");
    assert_eq!(params, vec![Value::from("%A\\_b%")]);
}
