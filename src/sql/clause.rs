//! Clause assembly.
//!
//! Pre-rendered fragments are emitted in a fixed order:
//!
//! ```text
//! head, joins, append join, WHERE (base AND append), GROUP BY, HAVING,
//! ORDER BY, LIMIT, OFFSET, RETURNING
//! ```
//!
//! Empty clauses are skipped and the result is trimmed.

use serde_json::Value;

use super::token::{Token, TokenStream};
use crate::model::{Bound, SortDir};

/// Extra fragments supplied by the caller of a build.
///
/// Correlated subqueries use `filter` to attach their foreign-key equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Append {
    /// Join text, emitted after the compiler's own joins.
    pub join: Option<String>,
    /// Predicate text, ANDed after the base WHERE.
    pub filter: Option<String>,
}

impl Append {
    pub fn filter(sql: impl Into<String>) -> Self {
        Self {
            join: None,
            filter: Some(sql.into()),
        }
    }

    pub fn join(sql: impl Into<String>) -> Self {
        Self {
            join: Some(sql.into()),
            filter: None,
        }
    }
}

/// The rendered parts of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "clauses have no effect until converted to SQL with to_sql()"]
pub struct Clauses {
    /// `SELECT ... FROM ...`, `UPDATE ... SET ...` or `DELETE FROM ...`.
    pub head: String,
    /// Join fragments, each with a leading space.
    pub joins: String,
    pub filter: Option<String>,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub order_by: Vec<(String, SortDir)>,
    pub limit: Option<Bound>,
    pub offset: Option<Bound>,
    pub returning: Vec<String>,
}

impl Clauses {
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            ..Default::default()
        }
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, append: Option<&Append>) -> TokenStream {
        let mut ts = TokenStream::new();
        let append_join = append.and_then(|a| a.join.as_deref()).filter(|s| !s.is_empty());
        let append_filter = append
            .and_then(|a| a.filter.as_deref())
            .filter(|s| !s.is_empty());

        ts.fragment(self.head.as_str()).fragment(self.joins.as_str());
        if let Some(join) = append_join {
            ts.fragment(join);
        }

        // WHERE
        let base_filter = self.filter.as_deref().filter(|s| !s.is_empty());
        match (base_filter, append_filter) {
            (Some(base), Some(extra)) => {
                ts.space()
                    .push(Token::Where)
                    .space()
                    .fragment(base)
                    .space()
                    .push(Token::And)
                    .space()
                    .fragment(extra);
            }
            (Some(only), None) | (None, Some(only)) => {
                ts.space().push(Token::Where).space().fragment(only);
            }
            (None, None) => {}
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            ts.comma_separated(self.group_by.iter().map(|c| Token::Ident(c.clone())));
        }

        // HAVING
        if let Some(having) = self.having.as_deref().filter(|s| !s.is_empty()) {
            ts.space().push(Token::Having).space().fragment(having);
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            for (i, (column, dir)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(column.clone()))
                    .space()
                    .push(match dir {
                        SortDir::Asc => Token::Asc,
                        SortDir::Desc => Token::Desc,
                    });
            }
        }

        // LIMIT / OFFSET
        if let Some(limit) = &self.limit {
            ts.space().push(Token::Limit).space().push(bound_token(limit));
        }
        if let Some(offset) = &self.offset {
            ts.space().push(Token::Offset).space().push(bound_token(offset));
        }

        // RETURNING
        if !self.returning.is_empty() {
            ts.space().push(Token::Returning).space();
            ts.comma_separated(self.returning.iter().map(|c| Token::Ident(c.clone())));
        }

        ts
    }

    /// Convert to SQL text.
    pub fn to_sql(&self, append: Option<&Append>) -> String {
        self.to_tokens(append).serialize().trim().to_string()
    }
}

fn bound_token(bound: &Bound) -> Token {
    match bound {
        Bound::Count(n) => Token::Value(Value::from(*n)),
        Bound::Placeholder(text) => Token::Value(Value::String(text.clone())),
    }
}
