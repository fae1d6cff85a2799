//! Integration tests for SELECT compilation through `find_many`.
//!
//! Covers includes (one, many, many-to-many, nested, aliased) and the four
//! flat join kinds.

use insta::assert_snapshot;
use pgcompose::compile::{find_many, FindManyParams};
use pgcompose::format::raw;
use pgcompose::model::{Column, Relations, SelectQuery};
use pgcompose::QueryError;
use serde_json::{json, Value};

fn catalog() -> Value {
    json!({
        "albums": {
            "type": "MANY",
            "table": "albums",
            "field": "artist_id",
            "referenceTable": "artist",
            "referenceField": "id"
        },
        "artist": {
            "type": "ONE",
            "table": "artist",
            "field": "id",
            "referenceTable": "albums",
            "referenceField": "artist_id"
        },
        "producer": {
            "type": "ONE",
            "table": "producer",
            "field": "id",
            "referenceTable": "albums",
            "referenceField": "producer_id"
        },
        "genre": {
            "type": "MANY",
            "table": "genre",
            "field": "id",
            "referenceTable": "artists",
            "referenceField": "id",
            "junction": {
                "table": "genre_artist",
                "field": "genre_id",
                "referenceField": "artist_id"
            }
        }
    })
}

fn find(params: Value) -> Result<String, QueryError> {
    find_many(&FindManyParams::from_json(params)?)
}

fn artist_query(query: Value) -> String {
    find(json!({ "table": "artist", "query": query, "relations": catalog() })).unwrap()
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_aliased_columns() {
    let sql = find(json!({
        "table": "artist",
        "query": { "select": { "id": "ArtistId", "name": "Name" } }
    }))
    .unwrap();
    assert_snapshot!(sql, @r#"SELECT "ArtistId" AS "id", "Name" AS "name" FROM "artist""#);
}

#[test]
fn test_raw_column() {
    let mut params = FindManyParams {
        table: "artist".into(),
        query: SelectQuery::new().columns(["id"]),
        ..Default::default()
    };
    params
        .query
        .select
        .insert("countries".into(), Column::expr(raw("meta->'countries'")));

    assert_eq!(
        find_many(&params).unwrap(),
        r#"SELECT "id", meta->'countries' AS "countries" FROM "artist""#
    );
}

#[test]
fn test_empty_select_is_star() {
    let sql = find(json!({ "table": "artist" })).unwrap();
    assert_eq!(sql, r#"SELECT * FROM "artist""#);
}

// ============================================================================
// Include
// ============================================================================

#[test]
fn test_include_one_to_many() {
    let sql = artist_query(json!({
        "select": { "id": true, "name": true },
        "include": { "albums": { "select": { "title": true } } }
    }));
    assert_snapshot!(sql, @r#"SELECT "id", "name", "albums" FROM "artist" LEFT JOIN LATERAL (SELECT jsonb_agg("albums") AS "albums" FROM (SELECT jsonb_build_object('title', "title") AS "albums" FROM "albums" WHERE "albums"."artist_id" = "artist"."id") ) ON TRUE"#);
}

#[test]
fn test_include_many_to_many() {
    let sql = artist_query(json!({
        "select": { "id": true, "name": true },
        "include": { "genre": { "select": { "title": true } } }
    }));
    assert_eq!(
        sql,
        r#"SELECT "id", "name", "genre" FROM "artist" LEFT JOIN LATERAL (SELECT jsonb_agg("genre") AS "genre" FROM (SELECT jsonb_build_object('title', "title") AS "genre" FROM "genre_artist" LEFT JOIN "genre" ON "genre_artist"."genre_id" = "genre"."id" WHERE "genre_artist"."artist_id" = "artists"."id") ) ON TRUE"#
    );
}

#[test]
fn test_nested_include() {
    let sql = artist_query(json!({
        "select": { "id": true, "name": true },
        "include": {
            "albums": {
                "select": { "title": true },
                "include": { "producer": { "select": { "name": true } } }
            }
        }
    }));
    assert_eq!(
        sql,
        r#"SELECT "id", "name", "albums" FROM "artist" LEFT JOIN LATERAL (SELECT jsonb_agg("albums") AS "albums" FROM (SELECT jsonb_build_object('title', "title", 'producer', "producer") AS "albums" FROM "albums" LEFT JOIN LATERAL (SELECT "producer" FROM (SELECT jsonb_build_object('name', "name") AS "producer" FROM "producer" WHERE "producer"."id" = "albums"."producer_id") ) ON TRUE WHERE "albums"."artist_id" = "artist"."id") ) ON TRUE"#
    );
}

#[test]
fn test_include_undefined_relation() {
    let err = find(json!({
        "table": "artist",
        "query": {
            "select": { "id": true, "name": true },
            "include": { "managers": { "select": { "name": true } } }
        },
        "relations": catalog()
    }))
    .unwrap_err();
    assert_eq!(err.to_string(), "Relation managers is not defined");
}

#[test]
fn test_table_alias() {
    let sql = find(json!({
        "table": "product_categories",
        "tableAlias": "categories",
        "query": {
            "select": { "id": true, "name": true },
            "where": { "parent_id": { "is": "NULL" } }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id", "name" FROM "product_categories" AS "categories" WHERE "parent_id" IS NULL"#
    );
}

#[test]
fn test_self_relation_with_alias() {
    let sql = find(json!({
        "table": "product_categories",
        "query": {
            "select": { "id": true, "name": true },
            "where": { "parent_id": { "is": "NULL" } },
            "include": { "subcategories": { "select": { "name": true } } }
        },
        "relations": {
            "subcategories": {
                "type": "MANY",
                "table": "product_categories",
                "tableAlias": "sub_categories",
                "field": "parent_id",
                "referenceTable": "product_categories",
                "referenceField": "id"
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id", "name", "subcategories" FROM "product_categories" LEFT JOIN LATERAL (SELECT jsonb_agg("subcategories") AS "subcategories" FROM (SELECT jsonb_build_object('name', "name") AS "subcategories" FROM "product_categories" AS "sub_categories" WHERE "sub_categories"."parent_id" = "product_categories"."id") ) ON TRUE WHERE "parent_id" IS NULL"#
    );
}

#[test]
fn test_nested_alias_through_junction() {
    let sql = find(json!({
        "table": "offers",
        "query": {
            "select": { "id": true, "title": true },
            "include": {
                "payment_offers": {
                    "select": { "title": true, "description": true },
                    "where": { "is_active": true },
                    "include": {
                        "payment_method": {
                            "select": { "name": true, "logo": true, "type": true }
                        }
                    }
                }
            }
        },
        "relations": {
            "payment_offers": {
                "type": "MANY",
                "table": "payment_offers",
                "tableAlias": "po",
                "field": "id",
                "referenceTable": "offers",
                "referenceField": "id",
                "junction": {
                    "table": "offer_payment_offer",
                    "field": "payment_offer_id",
                    "referenceField": "offer_id"
                }
            },
            "payment_method": {
                "table": "payment_methods",
                "tableAlias": "pm",
                "field": "id",
                "referenceTable": "po",
                "referenceField": "payment_method_id"
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "id", "title", "payment_offers" FROM "offers" LEFT JOIN LATERAL (SELECT jsonb_agg("payment_offers") AS "payment_offers" FROM (SELECT jsonb_build_object('title', "title", 'description', "description", 'payment_method', "payment_method") AS "payment_offers" FROM "offer_payment_offer" LEFT JOIN "payment_offers" AS "po" ON "offer_payment_offer"."payment_offer_id" = "po"."id" LEFT JOIN LATERAL (SELECT "payment_method" FROM (SELECT jsonb_build_object('name', "name", 'logo', "logo", 'type', "type") AS "payment_method" FROM "payment_methods" AS "pm" WHERE "pm"."id" = "po"."payment_method_id") ) ON TRUE WHERE "is_active" = true AND "offer_payment_offer"."offer_id" = "offers"."id") ) ON TRUE"#
    );
}

// ============================================================================
// Flat joins
// ============================================================================

#[test]
fn test_flat_join_kinds() {
    for (key, keyword) in [
        ("leftJoin", "LEFT"),
        ("rightJoin", "RIGHT"),
        ("innerJoin", "INNER"),
        ("fullJoin", "FULL"),
    ] {
        let sql = artist_query(json!({
            "select": { "id": true, "name": true },
            key: { "albums": { "select": { "title": true } } }
        }));
        assert_eq!(
            sql,
            format!(
                r#"SELECT "id", "name", "title" FROM "artist" {keyword} JOIN "albums" ON "albums"."artist_id" = "artist"."id""#
            )
        );
    }
}

#[test]
fn test_flat_join_undefined_relation() {
    for key in ["leftJoin", "rightJoin", "innerJoin", "fullJoin"] {
        let err = find(json!({
            "table": "artist",
            "query": {
                "select": { "id": true },
                key: { "vinyls": { "select": { "title": true } } }
            },
            "relations": catalog()
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Relation vinyls is not defined");
    }
}

#[test]
fn test_left_join_with_alias() {
    let sql = find(json!({
        "table": "product_categories",
        "query": {
            "select": {
                "product_categories.id": true,
                "product_categories.name": true
            },
            "where": { "product_categories.parent_id": { "is": "NULL" } },
            "leftJoin": {
                "subcategories": {
                    "select": { "subcategory_name": "sub_categories.name" }
                }
            }
        },
        "relations": {
            "subcategories": {
                "type": "MANY",
                "table": "product_categories",
                "tableAlias": "sub_categories",
                "field": "parent_id",
                "referenceTable": "product_categories",
                "referenceField": "id"
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "product_categories"."id", "product_categories"."name", "sub_categories"."name" AS "subcategory_name" FROM "product_categories" LEFT JOIN "product_categories" AS "sub_categories" ON "sub_categories"."parent_id" = "product_categories"."id" WHERE "product_categories"."parent_id" IS NULL"#
    );
}

#[test]
fn test_left_join_through_junction_with_alias() {
    let sql = find(json!({
        "table": "offers",
        "tableAlias": "of",
        "query": {
            "select": { "of.id": true, "title": "of.title" },
            "leftJoin": {
                "payment_offers": {
                    "select": {
                        "payment_offer_title": "po.title",
                        "payment_offer_description": "po.description"
                    }
                }
            }
        },
        "relations": {
            "payment_offers": {
                "type": "MANY",
                "table": "payment_offers",
                "tableAlias": "po",
                "field": "id",
                "referenceTable": "of",
                "referenceField": "id",
                "junction": {
                    "table": "offer_payment_offer",
                    "field": "payment_offer_id",
                    "referenceField": "offer_id"
                }
            }
        }
    }))
    .unwrap();
    assert_eq!(
        sql,
        r#"SELECT "of"."id", "of"."title" AS "title", "po"."title" AS "payment_offer_title", "po"."description" AS "payment_offer_description" FROM "offers" AS "of" LEFT JOIN "offer_payment_offer" ON "offer_payment_offer"."offer_id" = "of"."id" LEFT JOIN "payment_offers" AS "po" ON "offer_payment_offer"."payment_offer_id" = "po"."id""#
    );
}

#[test]
fn test_include_and_join_together() {
    let sql = artist_query(json!({
        "select": { "id": true },
        "include": { "genre": { "select": { "title": true } } },
        "innerJoin": { "albums": { "select": { "title": true }, "where": { "year": 1999 } } }
    }));
    assert_eq!(
        sql,
        r#"SELECT "id", "genre", "title" FROM "artist" LEFT JOIN LATERAL (SELECT jsonb_agg("genre") AS "genre" FROM (SELECT jsonb_build_object('title', "title") AS "genre" FROM "genre_artist" LEFT JOIN "genre" ON "genre_artist"."genre_id" = "genre"."id" WHERE "genre_artist"."artist_id" = "artists"."id") ) ON TRUE INNER JOIN "albums" ON "albums"."artist_id" = "artist"."id" WHERE "year" = 1999"#
    );
}

#[test]
fn test_false_column_rejected() {
    let err = find(json!({
        "table": "artist",
        "query": { "select": { "id": false } }
    }))
    .unwrap_err();
    assert!(matches!(err, QueryError::InvalidDescriptor(_)));
}

#[test]
fn test_output_is_stable_across_runs_and_catalog_order() {
    let mut params = FindManyParams::from_json(json!({
        "table": "artist",
        "query": {
            "select": { "id": true, "name": true },
            "include": {
                "albums": {
                    "select": { "title": true },
                    "include": { "producer": { "select": { "name": true } } }
                },
                "genre": { "select": { "title": true } }
            },
            "where": {
                "exists": { "albums": { "where": { "year": { "greaterThan": 2000 } } } },
                "id": { "in": { "genre": { "select": { "artist_id": true } } } }
            },
            "orderBy": { "name": "ASC" },
            "limit": 10
        },
        "relations": catalog()
    }))
    .unwrap();

    let first = find_many(&params).unwrap();
    let second = find_many(&params).unwrap();
    assert_eq!(first, second);

    let reversed: Relations = params.relations.clone().into_iter().rev().collect();
    assert_ne!(
        reversed.keys().collect::<Vec<_>>(),
        params.relations.keys().collect::<Vec<_>>()
    );
    params.relations = reversed;
    assert_eq!(find_many(&params).unwrap(), first);
}
