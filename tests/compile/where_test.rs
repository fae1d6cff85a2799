//! Integration tests for predicates and trailing clauses in full SELECTs.

use pgcompose::compile::{find_many, FindManyParams};
use pgcompose::model::{
    ExistsQuery, Operator, Predicate, Relation, Relations, SelectQuery, SortDir, SubQuery,
};
use pgcompose::{Compiler, QueryError};
use serde_json::{json, Value};

fn catalog() -> Relations {
    let mut relations = Relations::new();
    relations.insert(
        "profile".into(),
        Relation::one("profiles", "profile_id", "users", "id"),
    );
    relations.insert(
        "avatar".into(),
        Relation::one("avatars", "user_id", "users", "id").with_alias("a"),
    );
    relations.insert(
        "uploads".into(),
        Relation::many("uploads", "id", "users", "id").through("users_uploads", "upload_id", "user_id"),
    );
    relations
}

fn users(query: Value) -> Result<String, QueryError> {
    let mut params = FindManyParams::from_json(json!({ "table": "users", "query": query }))?;
    params.relations = catalog();
    find_many(&params)
}

#[test]
fn test_trailing_clause_order() {
    let sql = users(json!({
        "select": { "country": true, "total": "COUNT(id)" },
        "where": { "active": true },
        "groupBy": ["country"],
        "having": { "COUNT(id)": { "greaterThan": 10 } },
        "orderBy": { "country": "ASC", "total": "DESC" },
        "limit": 20,
        "offset": 40
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "country", COUNT(id) AS "total" FROM "users" WHERE "active" = true GROUP BY "country" HAVING COUNT(id) > 10 ORDER BY "country" ASC, "total" DESC LIMIT 20 OFFSET 40"#
    );
}

#[test]
fn test_zero_limit_is_rendered() {
    let sql = users(json!({ "select": { "id": true }, "limit": 0, "offset": 0 })).unwrap();
    assert_eq!(sql, r#"SELECT "id" FROM "users" LIMIT 0 OFFSET 0"#);
}

#[test]
fn test_placeholder_bounds() {
    let sql = users(json!({ "select": { "id": true }, "limit": "$1", "offset": "$2" })).unwrap();
    assert_eq!(sql, r#"SELECT "id" FROM "users" LIMIT $1 OFFSET $2"#);
}

#[test]
fn test_nested_logic() {
    let sql = users(json!({
        "select": { "id": true },
        "where": {
            "OR": [
                { "role": "admin" },
                { "AND": [{ "role": "editor" }, { "verified": true }] }
            ],
            "NOT": { "banned": true }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id" FROM "users" WHERE ("role" = 'admin' OR ("role" = 'editor' AND "verified" = true)) AND NOT("banned" = true)"#
    );
}

#[test]
fn test_exists_on_aliased_relation() {
    let sql = users(json!({
        "select": { "id": true },
        "where": { "exists": { "avatar": { "where": { "kind": "photo" } } } }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id" FROM "users" WHERE EXISTS(SELECT 1 FROM "avatars" AS "a" WHERE "kind" = 'photo' AND "a"."user_id" = "users"."id")"#
    );
}

#[test]
fn test_in_subquery_through_junction() {
    let sql = users(json!({
        "select": { "id": true },
        "where": { "id": { "in": { "uploads": { "select": { "user_id": true } } } } }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id" FROM "users" WHERE "id" IN(SELECT "user_id" FROM "users_uploads" LEFT JOIN "uploads" ON "users_uploads"."upload_id" = "uploads"."id" WHERE "users_uploads"."user_id" = "users"."id" )"#
    );
}

#[test]
fn test_typed_predicate_builder() {
    let relations = catalog();
    let query = SelectQuery::new()
        .columns(["id", "name"])
        .filter(
            Predicate::new()
                .op("age", Operator::GreaterThanOrEqual, json!(18))
                .op("name", Operator::ILike, json!("a%"))
                .exists("profile", ExistsQuery::Any)
                .exists(
                    "uploads",
                    ExistsQuery::Query(SubQuery::new().filter(Predicate::new().equals("kind", "pdf"))),
                ),
        )
        .order_by("name", SortDir::Asc);

    let sql = Compiler::new(&relations)
        .build_select("users", &query, None, None)
        .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id", "name" FROM "users" WHERE "age" >= 18 AND "name" ILIKE 'a%' AND EXISTS(SELECT 1 FROM "profiles" WHERE "profiles"."profile_id" = "users"."id") AND EXISTS(SELECT 1 FROM "users_uploads" LEFT JOIN "uploads" ON "users_uploads"."upload_id" = "uploads"."id" WHERE "kind" = 'pdf' AND "users_uploads"."user_id" = "users"."id" ) ORDER BY "name" ASC"#
    );
}

#[test]
fn test_string_literals_are_escaped() {
    let sql = users(json!({
        "select": { "id": true },
        "where": { "name": "O'Brien", "path": "C:\\temp" }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id" FROM "users" WHERE "name" = 'O''Brien' AND "path" = 'C:\\temp'"#
    );
}

#[test]
fn test_unknown_operator() {
    let err = users(json!({ "where": { "id": { "approximately": 1 } } })).unwrap_err();
    assert!(matches!(err, QueryError::InvalidDescriptor(_)));
    assert!(err.to_string().contains("Unknown operator 'approximately'"));
}

#[test]
fn test_malformed_operands() {
    let err = users(json!({ "where": { "id": { "in": 5 } } })).unwrap_err();
    assert!(err
        .to_string()
        .contains("Expected an array or a map of subqueries for 'in' operator"));

    let err = users(json!({ "where": { "id": { "between": [1] } } })).unwrap_err();
    assert!(matches!(err, QueryError::MalformedOperator { .. }));
}

#[test]
fn test_undefined_subquery_relation() {
    let err = users(json!({
        "where": { "id": { "greaterThan": { "all": { "scores": {} } } } }
    }))
    .unwrap_err();
    assert!(matches!(err, QueryError::RelationNotFound(name) if name == "scores"));
}
