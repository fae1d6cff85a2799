//! # pgcompose
//!
//! Compiles JSON-shaped query descriptors into PostgreSQL text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │      Descriptor (select, where, include, joins, ...)     │
//! │            + Relation catalog (name → Relation)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [expand]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Column set + lateral/flat joins + merged predicate     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [predicate, clause]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SQL text (PostgreSQL)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [params, optional]
//! ┌─────────────────────────────────────────────────────────┐
//! │            SQL with $n placeholders + values             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The compiler never touches a database. It produces text, and the binder
//! separately produces the values for that text.

pub mod compile;
pub mod config;
pub mod error;
pub mod model;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::dml;
pub use sql::format;
pub use sql::params;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{
        delete_many, find_many, insert_many, insert_one, update_many, DeleteManyParams,
        FindManyParams, InsertManyParams, InsertOneParams, UpdateManyParams,
    };
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::model::{
        Bound, Column, Condition, ExistsQuery, JoinQuery, Operand, Operator, Predicate,
        Quantifier, Relation, RelationType, Relations, SelectQuery, SortDir, SubQuery,
    };
    pub use crate::params::{bind_params, BoundQuery};
    pub use crate::sql::Compiler;
}

// Also export at crate root for convenience
pub use compile::{delete_many, find_many, insert_many, insert_one, update_many};
pub use error::{QueryError, QueryResult};
pub use params::{bind_params, BoundQuery};
pub use sql::Compiler;
