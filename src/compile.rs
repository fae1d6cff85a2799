//! Operation entry points.
//!
//! Each operation validates its parameters and forwards to the compiler or
//! the DML builders:
//!
//! ```text
//! FindManyParams   → find_many   → SELECT ...
//! InsertOneParams  → insert_one  → INSERT INTO ... VALUES (...)
//! InsertManyParams → insert_many → INSERT INTO ... VALUES (...), (...)
//! UpdateManyParams → update_many → UPDATE ... SET ...
//! DeleteManyParams → delete_many → DELETE FROM ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pgcompose::compile::{find_many, FindManyParams};
//! use serde_json::json;
//!
//! let params = FindManyParams::from_json(json!({
//!     "table": "artist",
//!     "query": {
//!         "select": { "id": true, "name": true },
//!         "include": { "albums": { "select": { "title": true } } }
//!     },
//!     "relations": {
//!         "albums": {
//!             "type": "MANY",
//!             "table": "albums",
//!             "field": "artist_id",
//!             "referenceTable": "artist",
//!             "referenceField": "id"
//!         }
//!     }
//! }))?;
//! println!("{}", find_many(&params)?);
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dml::{Delete, Insert, OnConflict, Update};
use crate::error::{QueryError, QueryResult};
use crate::model::{Predicate, Relations, SelectQuery};
use crate::sql::expand::Compiler;

const MISSING_TABLE: &str = "Table name is missing or invalid";
const INVALID_INSERT_DATA: &str = "Data object cannot be empty or invalid";
const INVALID_INSERT_MANY_DATA: &str = "Data must be a non-empty array";
const INVALID_UPDATE_DATA: &str = "Data object cannot be empty, an array, or otherwise invalid";

// ============================================================================
// Parameters
// ============================================================================

/// Parameters for [`find_many`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyParams {
    pub table: String,
    #[serde(default)]
    pub table_alias: Option<String>,
    #[serde(default)]
    pub query: SelectQuery,
    #[serde(default)]
    pub relations: Relations,
}

/// Parameters for [`insert_one`].
///
/// `data` stays untyped so that its shape can be reported as a validation
/// error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneParams {
    pub table: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, alias = "select")]
    pub returning: Vec<String>,
    #[serde(default)]
    pub on_conflict: Option<OnConflictSpec>,
    #[serde(default)]
    pub relations: Relations,
}

/// Parameters for [`insert_many`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyParams {
    pub table: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, alias = "select")]
    pub returning: Vec<String>,
    #[serde(default)]
    pub on_conflict: Option<OnConflictSpec>,
    #[serde(default)]
    pub relations: Relations,
}

/// Parameters for [`update_many`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManyParams {
    pub table: String,
    #[serde(default)]
    pub query: UpdateQuery,
    #[serde(default)]
    pub relations: Relations,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateQuery {
    pub data: Value,
    #[serde(rename = "where")]
    pub filter: Option<Predicate>,
    pub returning: Vec<String>,
}

/// Parameters for [`delete_many`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyParams {
    pub table: String,
    #[serde(default)]
    pub query: Option<DeleteQuery>,
    #[serde(default)]
    pub relations: Relations,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteQuery {
    #[serde(rename = "where")]
    pub filter: Option<Predicate>,
    pub returning: Vec<String>,
}

/// `onConflict` descriptor: exactly one of `columns` or `constraint`.
#[derive(Debug, Clone, Deserialize)]
pub struct OnConflictSpec {
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub constraint: Option<String>,
    pub action: ConflictActionSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ConflictActionSpec {
    #[serde(rename = "DO NOTHING")]
    DoNothing,
    #[serde(rename = "DO UPDATE")]
    DoUpdate {
        data: Map<String, Value>,
        #[serde(default, rename = "where")]
        filter: Option<Predicate>,
    },
}

macro_rules! impl_from_json {
    ($($params:ty),*) => {
        $(
            impl $params {
                /// Read parameters from untyped JSON.
                pub fn from_json(value: Value) -> QueryResult<Self> {
                    from_json(value)
                }
            }
        )*
    };
}

impl_from_json!(
    FindManyParams,
    InsertOneParams,
    InsertManyParams,
    UpdateManyParams,
    DeleteManyParams
);

fn from_json<T: DeserializeOwned>(value: Value) -> QueryResult<T> {
    Ok(serde_json::from_value(value)?)
}

// ============================================================================
// Operations
// ============================================================================

/// Compile a SELECT.
pub fn find_many(params: &FindManyParams) -> QueryResult<String> {
    check_table(&params.table)?;
    debug!(table = %params.table, operation = "find_many", "compiling");

    Compiler::new(&params.relations).build_select(
        &params.table,
        &params.query,
        params.table_alias.as_deref(),
        None,
    )
}

/// Compile a single-row INSERT.
pub fn insert_one(params: &InsertOneParams) -> QueryResult<String> {
    check_table(&params.table)?;
    let data = non_empty_object(&params.data)
        .ok_or_else(|| QueryError::validation(INVALID_INSERT_DATA))?;
    debug!(table = %params.table, operation = "insert_one", "compiling");

    let insert = Insert::into(params.table.as_str())
        .columns(data.keys().cloned())
        .values(data.values().cloned())
        .returning(params.returning.iter().cloned());
    finish_insert(insert, params.on_conflict.as_ref(), &params.relations)
}

/// Compile a multi-row INSERT.
///
/// Columns come from the first row; rows missing a column insert `NULL`.
pub fn insert_many(params: &InsertManyParams) -> QueryResult<String> {
    check_table(&params.table)?;
    let rows = match &params.data {
        Value::Array(rows) if !rows.is_empty() => rows,
        _ => return Err(QueryError::validation(INVALID_INSERT_MANY_DATA)),
    };
    let columns: Vec<String> = match non_empty_object(&rows[0]) {
        Some(first) => first.keys().cloned().collect(),
        None => return Err(QueryError::validation(INVALID_INSERT_MANY_DATA)),
    };
    debug!(table = %params.table, operation = "insert_many", rows = rows.len(), "compiling");

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(row) = row else {
            return Err(QueryError::validation(INVALID_INSERT_MANY_DATA));
        };
        values.push(
            columns
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }

    let insert = Insert::into(params.table.as_str())
        .columns(columns)
        .values_many(values)
        .returning(params.returning.iter().cloned());
    finish_insert(insert, params.on_conflict.as_ref(), &params.relations)
}

/// Compile an UPDATE.
pub fn update_many(params: &UpdateManyParams) -> QueryResult<String> {
    check_table(&params.table)?;
    let data = non_empty_object(&params.query.data)
        .ok_or_else(|| QueryError::validation(INVALID_UPDATE_DATA))?;
    debug!(table = %params.table, operation = "update_many", "compiling");

    let mut update = Update::table(params.table.as_str())
        .set_many(data.iter().map(|(column, value)| (column.as_str(), value.clone())))
        .returning(params.query.returning.iter().cloned());
    if let Some(filter) = compile_filter(&params.relations, params.query.filter.as_ref())? {
        update = update.filter(filter);
    }
    Ok(update.to_sql())
}

/// Compile a DELETE.
pub fn delete_many(params: &DeleteManyParams) -> QueryResult<String> {
    check_table(&params.table)?;
    debug!(table = %params.table, operation = "delete_many", "compiling");

    let mut delete = Delete::from(params.table.as_str());
    if let Some(query) = &params.query {
        delete = delete.returning(query.returning.iter().cloned());
        if let Some(filter) = compile_filter(&params.relations, query.filter.as_ref())? {
            delete = delete.filter(filter);
        }
    }
    Ok(delete.to_sql())
}

// ============================================================================
// Helpers
// ============================================================================

fn check_table(table: &str) -> QueryResult<()> {
    if table.trim().is_empty() {
        return Err(QueryError::validation(MISSING_TABLE));
    }
    Ok(())
}

fn non_empty_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object().filter(|map| !map.is_empty())
}

fn compile_filter(
    relations: &Relations,
    filter: Option<&Predicate>,
) -> QueryResult<Option<String>> {
    match filter {
        Some(predicate) if !predicate.is_empty() => {
            let sql = Compiler::new(relations).filter(predicate)?;
            Ok(Some(sql).filter(|sql| !sql.is_empty()))
        }
        _ => Ok(None),
    }
}

fn finish_insert(
    insert: Insert,
    spec: Option<&OnConflictSpec>,
    relations: &Relations,
) -> QueryResult<String> {
    let insert = match spec {
        Some(spec) => insert.on_conflict(on_conflict(spec, relations)?),
        None => insert,
    };
    Ok(insert.to_sql())
}

fn on_conflict(spec: &OnConflictSpec, relations: &Relations) -> QueryResult<OnConflict> {
    let conflict = match (&spec.columns, &spec.constraint) {
        (Some(columns), None) if !columns.is_empty() => OnConflict::columns(columns.iter().cloned()),
        (None, Some(name)) if !name.trim().is_empty() => OnConflict::constraint(name.as_str()),
        _ => {
            return Err(QueryError::validation(
                "onConflict needs either a non-empty columns list or a constraint name",
            ))
        }
    };

    Ok(match &spec.action {
        ConflictActionSpec::DoNothing => conflict.do_nothing(),
        ConflictActionSpec::DoUpdate { data, filter } => {
            if data.is_empty() {
                return Err(QueryError::validation(INVALID_UPDATE_DATA));
            }
            let filter = compile_filter(relations, filter.as_ref())?;
            conflict.do_update(
                data.iter().map(|(column, value)| (column.as_str(), value.clone())),
                filter,
            )
        }
    })
}
