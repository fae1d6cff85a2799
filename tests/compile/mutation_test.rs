//! Integration tests for INSERT, UPDATE and DELETE compilation.

use insta::assert_snapshot;
use pgcompose::compile::{
    delete_many, insert_many, insert_one, update_many, DeleteManyParams, InsertManyParams,
    InsertOneParams, UpdateManyParams,
};
use pgcompose::QueryError;
use serde_json::{json, Value};

fn insert(params: Value) -> Result<String, QueryError> {
    insert_one(&InsertOneParams::from_json(params)?)
}

fn insert_rows(params: Value) -> Result<String, QueryError> {
    insert_many(&InsertManyParams::from_json(params)?)
}

fn update(params: Value) -> Result<String, QueryError> {
    update_many(&UpdateManyParams::from_json(params)?)
}

fn delete(params: Value) -> Result<String, QueryError> {
    delete_many(&DeleteManyParams::from_json(params)?)
}

// ============================================================================
// INSERT
// ============================================================================

#[test]
fn test_insert_one_with_returning() {
    let sql = insert(json!({
        "table": "users",
        "data": { "name": "John Doe", "age": 30 },
        "select": ["id", "name"]
    }))
    .unwrap();
    assert_snapshot!(sql, @r#"INSERT INTO "users" ("name", "age") VALUES ('John Doe', 30) RETURNING "id", "name""#);
}

#[test]
fn test_insert_one_without_returning() {
    let sql = insert(json!({
        "table": "users",
        "data": { "name": "John Doe", "age": 30 },
        "returning": []
    }))
    .unwrap();
    assert_eq!(sql, r#"INSERT INTO "users" ("name", "age") VALUES ('John Doe', 30)"#);
}

#[test]
fn test_insert_one_validation() {
    let err = insert(json!({ "table": "", "data": { "name": "John Doe" } })).unwrap_err();
    assert_eq!(err.to_string(), "Table name is missing or invalid");

    for data in [json!({}), json!("invalid-data"), json!([])] {
        let err = insert(json!({ "table": "users", "data": data })).unwrap_err();
        assert_eq!(err.to_string(), "Data object cannot be empty or invalid");
    }
}

#[test]
fn test_insert_one_nulls_and_quotes() {
    assert_eq!(
        insert(json!({ "table": "users", "data": { "name": null, "age": null } })).unwrap(),
        r#"INSERT INTO "users" ("name", "age") VALUES (NULL, NULL)"#
    );
    assert_eq!(
        insert(json!({ "table": "users", "data": { "name": "Smith's" } })).unwrap(),
        r#"INSERT INTO "users" ("name") VALUES ('Smith''s')"#
    );
}

#[test]
fn test_insert_json_object_value() {
    let sql = insert(json!({
        "table": "events",
        "data": { "payload": { "kind": "click", "x": 1 } }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "events" ("payload") VALUES ('{"kind":"click","x":1}')"#
    );
}

#[test]
fn test_insert_many_with_returning() {
    let sql = insert_rows(json!({
        "table": "users",
        "data": [
            { "name": "John Doe", "age": 30 },
            { "name": "Jane Smith", "age": 25 }
        ],
        "select": ["id", "name"]
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "users" ("name", "age") VALUES ('John Doe', 30), ('Jane Smith', 25) RETURNING "id", "name""#
    );
}

#[test]
fn test_insert_many_validation() {
    let err = insert_rows(json!({ "table": "", "data": [{ "name": "John Doe" }] })).unwrap_err();
    assert_eq!(err.to_string(), "Table name is missing or invalid");

    for data in [json!({}), json!([])] {
        let err = insert_rows(json!({ "table": "users", "data": data })).unwrap_err();
        assert_eq!(err.to_string(), "Data must be a non-empty array");
    }
}

#[test]
fn test_insert_many_escapes_and_nulls() {
    let sql = insert_rows(json!({
        "table": "users",
        "data": [
            { "name": "Smith's", "age": null },
            { "name": "Jane Smith", "age": 25 }
        ]
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "users" ("name", "age") VALUES ('Smith''s', NULL), ('Jane Smith', 25)"#
    );
}

#[test]
fn test_on_conflict_do_nothing() {
    let sql = insert(json!({
        "table": "users",
        "data": { "email": "ann@example.com" },
        "onConflict": { "columns": ["email"], "action": { "type": "DO NOTHING" } }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "users" ("email") VALUES ('ann@example.com') ON CONFLICT ("email") DO NOTHING"#
    );
}

#[test]
fn test_on_conflict_constraint_do_update() {
    let sql = insert(json!({
        "table": "users",
        "data": { "email": "ann@example.com", "visits": 1 },
        "returning": ["id"],
        "onConflict": {
            "constraint": "users_email_key",
            "action": {
                "type": "DO UPDATE",
                "data": { "visits": 2 },
                "where": { "active": true }
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "users" ("email", "visits") VALUES ('ann@example.com', 1) ON CONFLICT ON CONSTRAINT "users_email_key" DO UPDATE SET "visits" = 2 WHERE "active" = true RETURNING "id""#
    );
}

#[test]
fn test_insert_many_on_conflict() {
    let sql = insert_rows(json!({
        "table": "tags",
        "data": [{ "name": "rust" }, { "name": "sql" }],
        "onConflict": { "columns": ["name"], "action": { "type": "DO NOTHING" } }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "tags" ("name") VALUES ('rust'), ('sql') ON CONFLICT ("name") DO NOTHING"#
    );
}

// ============================================================================
// UPDATE
// ============================================================================

#[test]
fn test_update_validation() {
    let err = update(json!({ "table": "", "query": { "data": {} } })).unwrap_err();
    assert_eq!(err.to_string(), "Table name is missing or invalid");

    let err = update(json!({ "table": "users", "query": { "data": {} } })).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data object cannot be empty, an array, or otherwise invalid"
    );
}

#[test]
fn test_simple_update() {
    let sql = update(json!({
        "table": "users",
        "query": { "data": { "verified": true, "status": "active" } }
    }))
    .unwrap();
    assert_eq!(sql, r#"UPDATE "users" SET "verified" = true, "status" = 'active'"#);
}

#[test]
fn test_update_with_condition_and_returning() {
    let sql = update(json!({
        "table": "users",
        "query": {
            "data": { "verified": true, "status": "active" },
            "where": { "id": 1 },
            "returning": ["id"]
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"UPDATE "users" SET "verified" = true, "status" = 'active' WHERE "id" = 1 RETURNING "id""#
    );
}

#[test]
fn test_update_with_correlated_condition() {
    let sql = update(json!({
        "table": "users",
        "query": {
            "data": { "status": "orphaned" },
            "where": { "NOT": { "exists": { "profile": true } } }
        },
        "relations": {
            "profile": {
                "table": "profiles",
                "field": "user_id",
                "referenceTable": "users",
                "referenceField": "id"
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"UPDATE "users" SET "status" = 'orphaned' WHERE NOT(EXISTS(SELECT 1 FROM "profiles" WHERE "profiles"."user_id" = "users"."id"))"#
    );
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn test_delete_without_conditions() {
    assert_eq!(
        delete(json!({ "table": "users", "query": {} })).unwrap(),
        r#"DELETE FROM "users""#
    );
    assert_eq!(delete(json!({ "table": "users" })).unwrap(), r#"DELETE FROM "users""#);
}

#[test]
fn test_delete_with_condition() {
    let sql = delete(json!({
        "table": "users",
        "query": { "where": { "id": 1 }, "returning": ["id", "email"] }
    }))
    .unwrap();
    assert_snapshot!(sql, @r#"DELETE FROM "users" WHERE "id" = 1 RETURNING "id", "email""#);
}

#[test]
fn test_delete_validation() {
    let err = delete(json!({ "table": "  " })).unwrap_err();
    assert!(matches!(err, QueryError::Validation(_)));
}
