//! SQL generation module.
//!
//! This module turns descriptors into PostgreSQL text. It includes:
//!
//! - [`format`] - Identifier and literal formatting (the only place values enter SQL)
//! - [`token`] - Token types for SQL generation
//! - [`join`] - JOIN fragments from catalog relations
//! - [`clause`] - Fixed-order clause assembly
//! - [`predicate`] - WHERE/HAVING compilation, including correlated subqueries
//! - [`expand`] - Select/include expansion into lateral JSON subqueries
//! - [`dml`] - Data Manipulation Language (INSERT, UPDATE, DELETE)
//! - [`params`] - Named placeholder binding

pub mod clause;
pub mod dml;
pub mod expand;
pub mod format;
pub mod join;
pub mod params;
pub mod predicate;
pub mod token;


// Re-export commonly used types at the sql module level
pub use clause::{Append, Clauses};
pub use dml::{ConflictAction, ConflictTarget, Delete, Insert, OnConflict, Update};
pub use expand::{object_list, select_list, Compiler};
pub use format::{
    concat, connect, escape_string_literal, format_value, pg_fn, quote_identifier,
    quote_json_identifier, raw,
};
pub use join::{join, JoinKind};
pub use params::{bind_params, BoundQuery};
pub use predicate::Logic;
pub use token::{Token, TokenStream};
