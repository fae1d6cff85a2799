//! Select/include expansion.
//!
//! A descriptor level expands into an output column set, accumulated join
//! text and a (possibly merged) predicate. Includes become lateral
//! subqueries that aggregate the related rows into JSON:
//!
//! ```text
//! SELECT "id", "albums" FROM "artist"
//! LEFT JOIN LATERAL (
//!     SELECT jsonb_agg("albums") AS "albums" FROM (
//!         SELECT jsonb_build_object('title', "title") AS "albums"
//!         FROM "albums" WHERE "albums"."artist_id" = "artist"."id"
//!     )
//! ) ON TRUE
//! ```

use tracing::trace;

use super::clause::{Append, Clauses};
use super::format::{quote_identifier, quote_string, table_ref};
use super::join::{correlation, join, junction_source, JoinKind};
use super::token::{Token, TokenStream};
use crate::error::QueryResult;
use crate::model::{resolve, Column, Predicate, Relation, Relations, Select, SelectQuery};

/// Compiles descriptors against a relation catalog.
///
/// The compiler only borrows the catalog, so one catalog can serve any
/// number of compilations, including concurrent ones.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    relations: &'a Relations,
}

/// One expanded descriptor level.
struct Level {
    columns: Select,
    joins: String,
    filter: Option<Predicate>,
}

impl<'a> Compiler<'a> {
    pub fn new(relations: &'a Relations) -> Self {
        Self { relations }
    }

    pub fn relations(&self) -> &'a Relations {
        self.relations
    }

    /// Build a top-level SELECT over `table`.
    pub fn build_select(
        &self,
        table: &str,
        query: &SelectQuery,
        alias: Option<&str>,
        append: Option<&Append>,
    ) -> QueryResult<String> {
        self.select_from(&table_ref(table, alias), query, append)
    }

    /// Build a top-level SELECT over an already rendered FROM source.
    pub(crate) fn select_from(
        &self,
        source: &str,
        query: &SelectQuery,
        append: Option<&Append>,
    ) -> QueryResult<String> {
        let level = self.expand(query)?;
        let head = select_head(select_list(&level.columns), source);
        Ok(self.clauses(head, level, query)?.to_sql(append))
    }

    /// Build the lateral subquery body for an included relation.
    ///
    /// `MANY` relations aggregate with `jsonb_agg`; `ONE` relations select
    /// the single object.
    pub fn build_nested(
        &self,
        key: &str,
        relation: &Relation,
        query: &SelectQuery,
    ) -> QueryResult<String> {
        let level = self.expand(query)?;
        let source = junction_source(relation).unwrap_or_else(|| {
            table_ref(&relation.table, relation.table_alias.as_deref())
        });
        let head = select_head(object_list(key, &level.columns), &source);
        let body = self
            .clauses(head, level, query)?
            .to_sql(Some(&Append::filter(correlation(relation))));

        let quoted = quote_identifier(key);
        let wrapped = if relation.is_many() {
            format!("SELECT jsonb_agg({quoted}) AS {quoted} FROM ({body}) ")
        } else {
            format!("SELECT {quoted} FROM ({body}) ")
        };
        Ok(wrapped)
    }

    fn expand(&self, query: &SelectQuery) -> QueryResult<Level> {
        let mut columns = query.select.clone();
        for key in query.include.keys() {
            columns.insert(key.clone(), Column::Reuse);
        }

        let mut joins = String::new();
        let mut filter = query.filter.clone();

        for (name, nested) in &query.include {
            let relation = resolve(self.relations, name)?;
            trace!(relation = %name, many = relation.is_many(), "expanding include");
            let inner = self.build_nested(name, relation, nested)?;
            joins.push_str(&join(JoinKind::LeftLateral, relation, Some(&inner)));
        }

        let flat_joins = [
            (JoinKind::Left, &query.left_join),
            (JoinKind::Right, &query.right_join),
            (JoinKind::Inner, &query.inner_join),
            (JoinKind::Full, &query.full_join),
        ];
        for (kind, entries) in flat_joins {
            for (name, joined) in entries {
                let relation = resolve(self.relations, name)?;
                trace!(relation = %name, ?kind, "expanding join");
                if let Some(extra) = &joined.filter {
                    filter.get_or_insert_with(Predicate::new).merge(extra);
                }
                joins.push_str(&join(kind, relation, None));
                for (alias, column) in &joined.select {
                    columns.insert(alias.clone(), column.clone());
                }
            }
        }

        Ok(Level {
            columns,
            joins,
            filter,
        })
    }

    fn clauses(&self, head: String, level: Level, query: &SelectQuery) -> QueryResult<Clauses> {
        let filter = match &level.filter {
            Some(predicate) => Some(self.filter(predicate)?),
            None => None,
        };
        let having = match &query.having {
            Some(predicate) => Some(self.filter(predicate)?),
            None => None,
        };
        Ok(Clauses {
            head,
            joins: level.joins,
            filter,
            group_by: query.group_by.clone(),
            having,
            order_by: query
                .order_by
                .iter()
                .map(|(column, dir)| (column.clone(), *dir))
                .collect(),
            limit: query.limit.clone(),
            offset: query.offset.clone(),
            returning: Vec::new(),
        })
    }
}

fn select_head(columns: String, source: &str) -> String {
    let mut ts = TokenStream::new();
    ts.push(Token::Select)
        .space()
        .fragment(columns)
        .space()
        .push(Token::From)
        .space()
        .fragment(source);
    ts.serialize()
}

/// `"a", expr AS "b"`, or `*` for an empty column set.
pub fn select_list(columns: &Select) -> String {
    if columns.is_empty() {
        return "*".into();
    }
    columns
        .iter()
        .map(|(alias, column)| match column {
            Column::Reuse => quote_identifier(alias),
            Column::Expr(source) => {
                format!("{} AS {}", quote_identifier(source), quote_identifier(alias))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `jsonb_build_object('a', "a", 'b', expr) AS "key"`
pub fn object_list(key: &str, columns: &Select) -> String {
    let pairs = columns
        .iter()
        .map(|(alias, column)| {
            let source = match column {
                Column::Reuse => quote_identifier(alias),
                Column::Expr(source) => quote_identifier(source),
            };
            format!("{}, {}", quote_string(alias), source)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("jsonb_build_object({}) AS {}", pairs, quote_identifier(key))
}
