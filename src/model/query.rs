//! Query descriptor types.
//!
//! These mirror the JSON shape callers send:
//!
//! ```text
//! {
//!   "select":  { "id": true, "title": "albums.name" },
//!   "where":   { "id": { "greaterThan": 10 } },
//!   "include": { "albums": { "select": { "title": true } } },
//!   "orderBy": { "id": "DESC" },
//!   "limit": 10
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::predicate::Predicate;

/// Output alias → column source.
pub type Select = IndexMap<String, Column>;

/// How an output column is sourced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ColumnRepr")]
pub enum Column {
    /// `true`: the output alias is also the source column.
    Reuse,
    /// An explicit source column or expression.
    Expr(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnRepr {
    Flag(bool),
    Source(String),
}

impl TryFrom<ColumnRepr> for Column {
    type Error = String;

    fn try_from(repr: ColumnRepr) -> Result<Self, Self::Error> {
        match repr {
            ColumnRepr::Flag(true) => Ok(Column::Reuse),
            ColumnRepr::Flag(false) => Err("a column must be `true` or a source expression".into()),
            ColumnRepr::Source(source) => Ok(Column::Expr(source)),
        }
    }
}

impl Column {
    pub fn expr(source: impl Into<String>) -> Self {
        Column::Expr(source.into())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// LIMIT/OFFSET operand: a count or placeholder text such as `$1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Count(u64),
    Placeholder(String),
}

impl From<u64> for Bound {
    fn from(count: u64) -> Self {
        Bound::Count(count)
    }
}

impl From<&str> for Bound {
    fn from(text: &str) -> Self {
        Bound::Placeholder(text.to_string())
    }
}

/// A flat join: its columns are merged into the parent select list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct JoinQuery {
    pub select: Select,
    #[serde(rename = "where")]
    pub filter: Option<Predicate>,
}

/// A SELECT descriptor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectQuery {
    pub select: Select,
    #[serde(rename = "where")]
    pub filter: Option<Predicate>,
    /// Relations nested as JSON through lateral subqueries.
    pub include: IndexMap<String, SelectQuery>,
    pub group_by: Vec<String>,
    pub having: Option<Predicate>,
    pub order_by: IndexMap<String, SortDir>,
    pub limit: Option<Bound>,
    pub offset: Option<Bound>,
    pub left_join: IndexMap<String, JoinQuery>,
    pub right_join: IndexMap<String, JoinQuery>,
    pub inner_join: IndexMap<String, JoinQuery>,
    pub full_join: IndexMap<String, JoinQuery>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select columns under their own names.
    pub fn columns<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self.select.insert(name.to_string(), Column::Reuse);
        }
        self
    }

    /// Select `source AS alias`.
    pub fn column_as(mut self, alias: &str, source: &str) -> Self {
        self.select.insert(alias.to_string(), Column::expr(source));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn include(mut self, relation: &str, query: SelectQuery) -> Self {
        self.include.insert(relation.to_string(), query);
        self
    }

    pub fn left_join(mut self, relation: &str, query: JoinQuery) -> Self {
        self.left_join.insert(relation.to_string(), query);
        self
    }

    pub fn group_by<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.group_by = columns.into_iter().map(String::from).collect();
        self
    }

    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order_by(mut self, column: &str, dir: SortDir) -> Self {
        self.order_by.insert(column.to_string(), dir);
        self
    }

    pub fn limit(mut self, limit: impl Into<Bound>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn offset(mut self, offset: impl Into<Bound>) -> Self {
        self.offset = Some(offset.into());
        self
    }
}

/// A descriptor used inside EXISTS / IN / SOME / ALL.
///
/// `table` bypasses the relation catalog; the caller is then responsible for
/// any correlation in `where`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubQuery {
    pub table: Option<String>,
    pub select: Select,
    #[serde(rename = "where")]
    pub filter: Option<Predicate>,
    pub group_by: Vec<String>,
    pub having: Option<Predicate>,
    pub order_by: IndexMap<String, SortDir>,
    pub limit: Option<Bound>,
    pub offset: Option<Bound>,
    pub left_join: IndexMap<String, JoinQuery>,
    pub right_join: IndexMap<String, JoinQuery>,
    pub inner_join: IndexMap<String, JoinQuery>,
    pub full_join: IndexMap<String, JoinQuery>,
}

impl SubQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn columns<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self.select.insert(name.to_string(), Column::Reuse);
        }
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// The SELECT descriptor this subquery compiles as.
    pub fn to_select_query(&self) -> SelectQuery {
        SelectQuery {
            select: self.select.clone(),
            filter: self.filter.clone(),
            include: IndexMap::new(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit.clone(),
            offset: self.offset.clone(),
            left_join: self.left_join.clone(),
            right_join: self.right_join.clone(),
            inner_join: self.inner_join.clone(),
            full_join: self.full_join.clone(),
        }
    }
}
