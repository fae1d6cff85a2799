//! DML (Data Manipulation Language) support.
//!
//! Builders for INSERT, UPDATE and DELETE statements. Values are JSON and
//! render through the literal formatter; filters are predicate text that
//! the compiler has already rendered.
//!
//! # Examples
//!
//! ```ignore
//! use pgcompose::dml::{Insert, OnConflict, Update, Delete};
//! use serde_json::json;
//!
//! // INSERT
//! let insert = Insert::into("users")
//!     .columns(["name", "email"])
//!     .values([json!("Alice"), json!("alice@example.com")])
//!     .on_conflict(OnConflict::columns(["email"]).do_nothing());
//!
//! // UPDATE
//! let update = Update::table("users")
//!     .set("status", json!("active"))
//!     .filter(r#""id" = 1"#);
//!
//! // DELETE
//! let delete = Delete::from("users").filter(r#""status" = 'inactive'"#);
//! ```

use serde_json::Value;

use super::clause::Clauses;
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<String>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = Value>) -> Self {
        self.values.push(vals.into_iter().collect());
        self
    }

    /// Add multiple rows of values.
    pub fn values_many(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.values.extend(rows);
        self
    }

    /// Add ON CONFLICT clause.
    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.on_conflict = Some(conflict);
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.returning = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Convert to SQL.
    pub fn to_sql(&self) -> String {
        self.to_tokens().serialize()
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        // INSERT INTO
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::Ident(self.table.clone()));

        // Columns
        if !self.columns.is_empty() {
            ts.space().lparen();
            ts.comma_separated(self.columns.iter().map(|c| Token::Ident(c.clone())));
            ts.rparen();
        }

        // VALUES
        if !self.values.is_empty() {
            ts.space().push(Token::Values);
            for (row_idx, row) in self.values.iter().enumerate() {
                if row_idx > 0 {
                    ts.comma();
                }
                ts.space().lparen();
                ts.comma_separated(row.iter().map(|v| Token::Value(v.clone())));
                ts.rparen();
            }
        }

        // ON CONFLICT
        if let Some(ref conflict) = self.on_conflict {
            ts.space().append(&conflict.to_tokens());
        }

        // RETURNING
        if !self.returning.is_empty() {
            ts.space().push(Token::Returning).space();
            ts.comma_separated(self.returning.iter().map(|c| Token::Ident(c.clone())));
        }

        ts
    }
}

/// Conflict target of an ON CONFLICT clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictTarget {
    /// `ON CONFLICT ("a", "b")`
    Columns(Vec<String>),
    /// `ON CONFLICT ON CONSTRAINT "name"`
    Constraint(String),
}

/// What to do when the conflict target fires.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate {
        set: Vec<(String, Value)>,
        filter: Option<String>,
    },
}

/// ON CONFLICT clause for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    pub target: ConflictTarget,
    pub action: ConflictAction,
}

impl OnConflict {
    /// Target a set of unique columns. Defaults to DO NOTHING.
    pub fn columns(cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            target: ConflictTarget::Columns(cols.into_iter().map(|c| c.into()).collect()),
            action: ConflictAction::DoNothing,
        }
    }

    /// Target a named constraint. Defaults to DO NOTHING.
    pub fn constraint(name: impl Into<String>) -> Self {
        Self {
            target: ConflictTarget::Constraint(name.into()),
            action: ConflictAction::DoNothing,
        }
    }

    pub fn do_nothing(mut self) -> Self {
        self.action = ConflictAction::DoNothing;
        self
    }

    /// Update the conflicting row, optionally only where `filter` holds.
    pub fn do_update(
        mut self,
        set: impl IntoIterator<Item = (impl Into<String>, Value)>,
        filter: Option<String>,
    ) -> Self {
        self.action = ConflictAction::DoUpdate {
            set: set.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            filter,
        };
        self
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::On).space().push(Token::Conflict).space();
        match &self.target {
            ConflictTarget::Columns(columns) => {
                ts.lparen();
                ts.comma_separated(columns.iter().map(|c| Token::Ident(c.clone())));
                ts.rparen();
            }
            ConflictTarget::Constraint(name) => {
                ts.push(Token::On)
                    .space()
                    .push(Token::Constraint)
                    .space()
                    .push(Token::Ident(name.clone()));
            }
        }

        ts.space().push(Token::Do).space();
        match &self.action {
            ConflictAction::DoNothing => {
                ts.push(Token::Nothing);
            }
            ConflictAction::DoUpdate { set, filter } => {
                ts.push(Token::Update).space().push(Token::Set).space();
                assignments(&mut ts, set);
                if let Some(filter) = filter.as_deref().filter(|f| !f.is_empty()) {
                    ts.space().push(Token::Where).space().fragment(filter);
                }
            }
        }

        ts
    }
}

fn assignments(ts: &mut TokenStream, set: &[(String, Value)]) {
    for (i, (col, value)) in set.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.push(Token::Ident(col.clone()))
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::Value(value.clone()));
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, Value)>,
    pub filter: Option<String>,
    pub returning: Vec<String>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            filter: None,
            returning: Vec::new(),
        }
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set.push((column.into(), value));
        self
    }

    /// Set multiple columns.
    pub fn set_many(
        mut self,
        assignments: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Self {
        self.set
            .extend(assignments.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Add WHERE clause. Repeated calls are ANDed.
    pub fn filter(mut self, sql: impl Into<String>) -> Self {
        self.filter = Some(and_filter(self.filter.take(), sql.into()));
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.returning = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Convert to SQL.
    pub fn to_sql(&self) -> String {
        self.to_clauses().to_sql(None)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_clauses().to_tokens(None)
    }

    fn to_clauses(&self) -> Clauses {
        let mut head = TokenStream::new();

        // UPDATE table SET ...
        head.push(Token::Update)
            .space()
            .push(Token::Ident(self.table.clone()))
            .space()
            .push(Token::Set)
            .space();
        assignments(&mut head, &self.set);

        Clauses {
            filter: self.filter.clone(),
            returning: self.returning.clone(),
            ..Clauses::new(head.serialize())
        }
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub table: String,
    pub filter: Option<String>,
    pub returning: Vec<String>,
}

impl Delete {
    /// Create a new DELETE statement.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            returning: Vec::new(),
        }
    }

    /// Add WHERE clause. Repeated calls are ANDed.
    pub fn filter(mut self, sql: impl Into<String>) -> Self {
        self.filter = Some(and_filter(self.filter.take(), sql.into()));
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.returning = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Convert to SQL.
    pub fn to_sql(&self) -> String {
        self.to_clauses().to_sql(None)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_clauses().to_tokens(None)
    }

    fn to_clauses(&self) -> Clauses {
        let mut head = TokenStream::new();

        // DELETE FROM table
        head.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.table.clone()));

        Clauses {
            filter: self.filter.clone(),
            returning: self.returning.clone(),
            ..Clauses::new(head.serialize())
        }
    }
}

fn and_filter(existing: Option<String>, sql: String) -> String {
    match existing.filter(|e| !e.is_empty()) {
        Some(existing) if !sql.is_empty() => {
            format!("{} {} {}", existing, Token::And.serialize(), sql)
        }
        Some(existing) => existing,
        None => sql,
    }
}

// ============================================================================
// Tests
// ============================================================================
